use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use super::finding::{Finding, TextRange};
use super::snapshot::Snapshot;

/// How a record's fix window was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The scanner reported the issue `FIXED`.
    Fixed,
    /// The resolver attributed the fix to the commit after the last `OPEN`.
    NextCommit,
    /// Still open as of the last observed commit.
    Open,
}

impl Resolution {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::NextCommit => "next_commit",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "next_commit" => Ok(Self::NextCommit),
            "open" => Ok(Self::Open),
            other => Err(format!("unknown resolution '{other}'")),
        }
    }
}

/// Reconstructed history of one issue key within one sample.
///
/// Identity and static metadata are fixed at the first sighting. The ledger
/// owns `closed_*` (set once) and `latest_open_*` (overwritten); the
/// resolver owns `next_commit_*` and `author_next_commit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub key: String,
    pub sample: String,

    pub open_date: NaiveDate,
    pub open_hash: String,

    pub closed_date: Option<NaiveDate>,
    pub closed_hash: Option<String>,
    pub author_close: Option<String>,

    pub latest_open_date: Option<NaiveDate>,
    pub latest_open_hash: Option<String>,
    pub author_latest_open: Option<String>,

    pub next_commit_date: Option<NaiveDate>,
    pub next_commit_hash: Option<String>,
    pub author_next_commit: Option<String>,

    /// Days from `open_date` to the close or to the resolution commit.
    pub fix_duration: Option<i64>,

    pub author: Option<String>,
    pub severity: Option<String>,
    pub rule: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub effort: Option<String>,
    pub debt: Option<String>,
    pub message: Option<String>,
    pub tags: Vec<String>,
    pub component: Option<String>,
    pub quick_fix_available: Option<bool>,
    pub clean_code_attribute: Option<String>,
    pub clean_code_attribute_category: Option<String>,
    pub text_range: Option<TextRange>,

    pub impacts: JsonValue,
    pub flows: JsonValue,
    pub transitions: JsonValue,
    pub actions: JsonValue,
    pub comments: JsonValue,
}

impl LifecycleRecord {
    /// Seed a record from the first snapshot a finding's key appears in.
    #[must_use]
    pub fn open(snapshot: &Snapshot, finding: &Finding) -> Self {
        Self {
            key: finding.key.clone(),
            sample: snapshot.sample.clone(),
            open_date: snapshot.commit_date,
            open_hash: snapshot.commit_hash.clone(),
            closed_date: None,
            closed_hash: None,
            author_close: None,
            latest_open_date: None,
            latest_open_hash: None,
            author_latest_open: None,
            next_commit_date: None,
            next_commit_hash: None,
            author_next_commit: None,
            fix_duration: None,
            author: finding.author.clone(),
            severity: finding.severity.clone(),
            rule: finding.rule.clone(),
            issue_type: finding.issue_type.clone(),
            effort: finding.effort.clone(),
            debt: finding.debt.clone(),
            message: finding.message.clone(),
            tags: finding.tags.clone(),
            component: finding.component.clone(),
            quick_fix_available: finding.quick_fix_available,
            clean_code_attribute: finding.clean_code_attribute.clone(),
            clean_code_attribute_category: finding.clean_code_attribute_category.clone(),
            text_range: finding.text_range,
            impacts: finding.impacts.clone(),
            flows: finding.flows.clone(),
            transitions: finding.transitions.clone(),
            actions: finding.actions.clone(),
            comments: finding.comments.clone(),
        }
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed_date.is_some()
    }

    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        if self.closed_date.is_some() {
            Resolution::Fixed
        } else if self.next_commit_hash.is_some() {
            Resolution::NextCommit
        } else {
            Resolution::Open
        }
    }

    /// Drop everything the resolver may have set.
    pub fn clear_resolver_fields(&mut self) {
        self.next_commit_date = None;
        self.next_commit_hash = None;
        self.author_next_commit = None;
        if !self.is_closed() {
            self.fix_duration = None;
        }
    }
}
