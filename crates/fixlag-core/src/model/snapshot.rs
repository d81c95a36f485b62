use chrono::NaiveDate;

use super::finding::Finding;

/// The issue list of one snapshot.
///
/// `Absent` keeps the commit's position in its sample's timeline when the
/// scanner produced nothing usable for it. An empty `Present` list is a
/// successful scan with zero findings.
#[derive(Debug, Clone, PartialEq)]
pub enum Issues {
    Present(Vec<Finding>),
    Absent,
}

impl Issues {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Findings in payload order; empty for an absent snapshot.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        match self {
            Self::Present(findings) => findings,
            Self::Absent => &[],
        }
    }
}

/// One static-analysis result set for a single commit of a single sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sample: String,
    pub commit_hash: String,
    pub commit_date: NaiveDate,
    /// Raw scanner timestamp, when the log carries one. Never interpreted.
    pub analyzed_at: Option<String>,
    pub issues: Issues,
}

impl Snapshot {
    #[must_use]
    pub fn new(
        sample: impl Into<String>,
        commit_hash: impl Into<String>,
        commit_date: NaiveDate,
        issues: Issues,
    ) -> Self {
        Self {
            sample: sample.into(),
            commit_hash: commit_hash.into(),
            commit_date,
            analyzed_at: None,
            issues,
        }
    }

    /// Author of the first finding, used as the author of a resolution commit.
    #[must_use]
    pub fn first_author(&self) -> Option<&str> {
        self.issues
            .findings()
            .first()
            .and_then(|finding| finding.author.as_deref())
    }
}
