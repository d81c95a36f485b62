//! Anomalies observed while reconstructing lifecycles.
//!
//! Nothing in the ledger or the resolver fails a run. Conditions an operator
//! may want to review are collected here instead and logged as they occur.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The kinds of anomaly the core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Issues payload missing or structurally invalid; the snapshot was kept as absent.
    MalformedSnapshot,
    /// A known key reported a status other than `OPEN`/`FIXED`.
    UnhandledFindingStatus,
    /// The latest open commit is not in the sample's commit index.
    UnresolvableLookahead,
    /// A computed fix duration was negative and discarded.
    NegativeDuration,
    /// No commit index exists for the record's sample.
    MissingSampleContext,
}

impl AnomalyKind {
    pub const ALL: [Self; 5] = [
        Self::MalformedSnapshot,
        Self::UnhandledFindingStatus,
        Self::UnresolvableLookahead,
        Self::NegativeDuration,
        Self::MissingSampleContext,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedSnapshot => "malformed_snapshot",
            Self::UnhandledFindingStatus => "unhandled_finding_status",
            Self::UnresolvableLookahead => "unresolvable_lookahead",
            Self::NegativeDuration => "negative_duration",
            Self::MissingSampleContext => "missing_sample_context",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub sample: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub detail: String,
}

impl Anomaly {
    #[must_use]
    pub fn new(kind: AnomalyKind, sample: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            sample: sample.into(),
            commit_hash: None,
            key: None,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn at_commit(mut self, commit_hash: impl Into<String>) -> Self {
        self.commit_hash = Some(commit_hash.into());
        self
    }

    #[must_use]
    pub fn for_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Anomalies collected over a run, in the order they were observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    anomalies: Vec<Anomaly>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an anomaly and emit it as a `tracing` event.
    pub fn record(&mut self, anomaly: Anomaly) {
        tracing::warn!(
            kind = %anomaly.kind,
            sample = %anomaly.sample,
            commit = anomaly.commit_hash.as_deref().unwrap_or(""),
            key = anomaly.key.as_deref().unwrap_or(""),
            "{}",
            anomaly.detail
        );
        self.anomalies.push(anomaly);
    }

    /// Append another run's anomalies after this one's.
    pub fn merge(&mut self, other: Self) {
        self.anomalies.extend(other.anomalies);
    }

    #[must_use]
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anomalies.len()
    }

    #[must_use]
    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.anomalies.iter().filter(|a| a.kind == kind).count()
    }

    /// Count per kind. Every kind is present, zero included.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<AnomalyKind, usize> {
        let mut counts: BTreeMap<AnomalyKind, usize> =
            AnomalyKind::ALL.iter().map(|kind| (*kind, 0)).collect();
        for anomaly in &self.anomalies {
            *counts.entry(anomaly.kind).or_default() += 1;
        }
        counts
    }
}
