//! Issue ledger: folds a sample's snapshots into lifecycle records.
//!
//! The [`SampleLedger`] replays snapshots of one sample in log order and
//! keeps exactly one [`LifecycleRecord`] per issue key. Ledgers never share
//! state, so different samples may be folded independently.
//!
//! # Transition rules
//!
//! For every finding of every present snapshot, in payload order:
//!
//! - **Unseen key**: a record is opened from this snapshot, whatever status
//!   the finding reports.
//! - **`FIXED`**: the first one stamps `closed_*` and the fix duration;
//!   later ones are no-ops.
//! - **`OPEN`**: `latest_open_*` is overwritten, also after a close.
//! - **Anything else**: the record is left alone and an
//!   [`AnomalyKind::UnhandledFindingStatus`] is recorded.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::diagnostics::{Anomaly, AnomalyKind, Diagnostics};
use crate::model::{Finding, FindingStatus, LifecycleRecord, Snapshot, days_between};

// ---------------------------------------------------------------------------
// FoldStats
// ---------------------------------------------------------------------------

/// Counters collected while folding one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    /// Snapshots applied, absent ones included.
    pub snapshots: usize,
    /// Snapshots that contributed no findings because their payload was absent.
    pub absent: usize,
    /// Findings observed across all snapshots.
    pub findings: usize,
    /// Records opened.
    pub opened: usize,
    /// Records closed by a `FIXED` observation.
    pub closed: usize,
    /// `OPEN` observations for keys that were already closed.
    pub open_after_close: usize,
    /// Observations with a status the ledger does not act on.
    pub unhandled: usize,
}

// ---------------------------------------------------------------------------
// SampleLedger
// ---------------------------------------------------------------------------

/// Lifecycle records of one sample, keyed by issue key.
///
/// Records are kept in first-sighting order.
#[derive(Debug, Clone, Default)]
pub struct SampleLedger {
    sample: String,
    records: Vec<LifecycleRecord>,
    index: HashMap<String, usize>,
    stats: FoldStats,
}

impl SampleLedger {
    #[must_use]
    pub fn new(sample: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            ..Self::default()
        }
    }

    /// Apply the next snapshot of this ledger's sample.
    ///
    /// Snapshots of another sample are ignored.
    pub fn apply(&mut self, snapshot: &Snapshot, diagnostics: &mut Diagnostics) {
        if snapshot.sample != self.sample {
            warn!(
                ledger = %self.sample,
                sample = %snapshot.sample,
                commit = %snapshot.commit_hash,
                "snapshot belongs to another sample; not applied"
            );
            return;
        }

        self.stats.snapshots += 1;
        if snapshot.issues.is_absent() {
            self.stats.absent += 1;
            trace!(sample = %self.sample, commit = %snapshot.commit_hash, "absent snapshot");
            return;
        }

        for finding in snapshot.issues.findings() {
            self.observe(snapshot, finding, diagnostics);
        }
    }

    fn observe(&mut self, snapshot: &Snapshot, finding: &Finding, diagnostics: &mut Diagnostics) {
        self.stats.findings += 1;

        let Some(&slot) = self.index.get(&finding.key) else {
            let record = LifecycleRecord::open(snapshot, finding);
            self.index.insert(finding.key.clone(), self.records.len());
            self.records.push(record);
            self.stats.opened += 1;
            return;
        };

        let record = &mut self.records[slot];
        match &finding.status {
            FindingStatus::Fixed => {
                if record.is_closed() {
                    return;
                }
                record.closed_date = Some(snapshot.commit_date);
                record.closed_hash = Some(snapshot.commit_hash.clone());
                record.author_close.clone_from(&finding.author);

                let days = days_between(record.open_date, snapshot.commit_date);
                if days < 0 {
                    record.fix_duration = None;
                    diagnostics.record(
                        Anomaly::new(
                            AnomalyKind::NegativeDuration,
                            self.sample.clone(),
                            format!(
                                "close on {} precedes open on {}; duration left empty",
                                snapshot.commit_date, record.open_date
                            ),
                        )
                        .at_commit(snapshot.commit_hash.clone())
                        .for_key(finding.key.clone()),
                    );
                } else {
                    record.fix_duration = Some(days);
                }
                self.stats.closed += 1;
            }
            FindingStatus::Open => {
                if record.is_closed() {
                    self.stats.open_after_close += 1;
                    debug!(
                        sample = %self.sample,
                        key = %finding.key,
                        commit = %snapshot.commit_hash,
                        "open observation after close"
                    );
                }
                record.latest_open_date = Some(snapshot.commit_date);
                record.latest_open_hash = Some(snapshot.commit_hash.clone());
                record.author_latest_open.clone_from(&finding.author);
            }
            FindingStatus::Other(status) => {
                self.stats.unhandled += 1;
                diagnostics.record(
                    Anomaly::new(
                        AnomalyKind::UnhandledFindingStatus,
                        self.sample.clone(),
                        format!("status '{status}' ignored for known issue"),
                    )
                    .at_commit(snapshot.commit_hash.clone())
                    .for_key(finding.key.clone()),
                );
            }
        }
    }

    #[must_use]
    pub fn sample(&self) -> &str {
        &self.sample
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LifecycleRecord> {
        self.index.get(key).map(|&slot| &self.records[slot])
    }

    #[must_use]
    pub fn records(&self) -> &[LifecycleRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<LifecycleRecord> {
        self.records
    }

    #[must_use]
    pub const fn stats(&self) -> FoldStats {
        self.stats
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// fold
// ---------------------------------------------------------------------------

/// Fold snapshots into one ledger per sample.
///
/// Ledgers are returned in order of each sample's first appearance. Within a
/// sample, snapshots are applied strictly in iteration order.
pub fn fold<'a>(
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
    diagnostics: &mut Diagnostics,
) -> Vec<SampleLedger> {
    let mut ledgers: Vec<SampleLedger> = Vec::new();
    let mut by_sample: HashMap<String, usize> = HashMap::new();

    for snapshot in snapshots {
        let slot = *by_sample
            .entry(snapshot.sample.clone())
            .or_insert_with(|| {
                ledgers.push(SampleLedger::new(snapshot.sample.clone()));
                ledgers.len() - 1
            });
        ledgers[slot].apply(snapshot, diagnostics);
    }

    ledgers
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Issues;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn snap(hash: &str, d: u32, findings: Vec<Finding>) -> Snapshot {
        Snapshot::new("s", hash, day(d), Issues::Present(findings))
    }

    fn open(key: &str) -> Finding {
        Finding::new(key, FindingStatus::Open)
    }

    fn fixed(key: &str) -> Finding {
        Finding::new(key, FindingStatus::Fixed)
    }

    fn fold_one(snaps: &[Snapshot]) -> (SampleLedger, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut ledgers = fold(snaps, &mut diags);
        assert_eq!(ledgers.len(), 1);
        (ledgers.remove(0), diags)
    }

    #[test]
    fn first_sighting_opens_record() {
        let (ledger, _) = fold_one(&[snap("c1", 1, vec![open("K")])]);
        let record = ledger.get("K").unwrap();
        assert_eq!(record.open_hash, "c1");
        assert_eq!(record.open_date, day(1));
        assert!(record.latest_open_hash.is_none());
        assert!(!record.is_closed());
    }

    #[test]
    fn first_sighting_as_fixed_still_opens() {
        let (ledger, _) = fold_one(&[snap("c1", 1, vec![fixed("K")])]);
        let record = ledger.get("K").unwrap();
        assert_eq!(record.open_hash, "c1");
        assert!(!record.is_closed());
    }

    #[test]
    fn fixed_closes_with_duration_and_author() {
        let (ledger, _) = fold_one(&[
            snap("c1", 1, vec![open("K")]),
            snap("c2", 6, vec![fixed("K").with_author("closer")]),
        ]);
        let record = ledger.get("K").unwrap();
        assert_eq!(record.closed_hash.as_deref(), Some("c2"));
        assert_eq!(record.closed_date, Some(day(6)));
        assert_eq!(record.author_close.as_deref(), Some("closer"));
        assert_eq!(record.fix_duration, Some(5));
    }

    #[test]
    fn first_fixed_wins() {
        let (ledger, _) = fold_one(&[
            snap("c1", 1, vec![open("K")]),
            snap("c2", 3, vec![fixed("K")]),
            snap("c3", 9, vec![fixed("K").with_author("late")]),
        ]);
        let record = ledger.get("K").unwrap();
        assert_eq!(record.closed_hash.as_deref(), Some("c2"));
        assert_eq!(record.author_close, None);
        assert_eq!(record.fix_duration, Some(2));
        assert_eq!(ledger.stats().closed, 1);
    }

    #[test]
    fn open_after_close_updates_latest_open() {
        let (ledger, _) = fold_one(&[
            snap("c1", 1, vec![open("K")]),
            snap("c2", 2, vec![fixed("K")]),
            snap("c3", 3, vec![open("K").with_author("again")]),
        ]);
        let record = ledger.get("K").unwrap();
        assert_eq!(record.closed_hash.as_deref(), Some("c2"));
        assert_eq!(record.latest_open_hash.as_deref(), Some("c3"));
        assert_eq!(record.author_latest_open.as_deref(), Some("again"));
        assert_eq!(ledger.stats().open_after_close, 1);
    }

    #[test]
    fn unhandled_status_is_flagged_and_ignored() {
        let (ledger, diags) = fold_one(&[
            snap("c1", 1, vec![open("K")]),
            snap("c2", 2, vec![fixed("K")]),
            snap("c3", 3, vec![Finding::new("K", "REOPENED")]),
        ]);
        let record = ledger.get("K").unwrap();
        assert_eq!(record.closed_hash.as_deref(), Some("c2"));
        assert!(record.latest_open_hash.is_none());
        assert_eq!(diags.count(AnomalyKind::UnhandledFindingStatus), 1);
        let anomaly = &diags.anomalies()[0];
        assert_eq!(anomaly.key.as_deref(), Some("K"));
        assert_eq!(anomaly.commit_hash.as_deref(), Some("c3"));
    }

    #[test]
    fn negative_close_duration_is_discarded() {
        let (ledger, diags) = fold_one(&[
            snap("c1", 10, vec![open("K")]),
            snap("c2", 4, vec![fixed("K")]),
        ]);
        let record = ledger.get("K").unwrap();
        assert_eq!(record.closed_hash.as_deref(), Some("c2"));
        assert_eq!(record.fix_duration, None);
        assert_eq!(diags.count(AnomalyKind::NegativeDuration), 1);
    }

    #[test]
    fn absent_snapshots_contribute_nothing() {
        let (ledger, diags) = fold_one(&[
            snap("c1", 1, vec![open("K")]),
            Snapshot::new("s", "c2", day(2), Issues::Absent),
        ]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.stats().snapshots, 2);
        assert_eq!(ledger.stats().absent, 1);
        assert!(diags.is_empty());
    }

    #[test]
    fn keys_are_never_merged_across_samples() {
        let snaps = [
            Snapshot::new("a", "a1", day(1), Issues::Present(vec![open("K")])),
            Snapshot::new("b", "b1", day(2), Issues::Present(vec![open("K")])),
            Snapshot::new("a", "a2", day(3), Issues::Present(vec![fixed("K")])),
        ];
        let mut diags = Diagnostics::new();
        let ledgers = fold(&snaps, &mut diags);
        assert_eq!(ledgers.len(), 2);
        assert_eq!(ledgers[0].sample(), "a");
        assert!(ledgers[0].get("K").unwrap().is_closed());
        assert!(!ledgers[1].get("K").unwrap().is_closed());
    }

    #[test]
    fn records_keep_first_sighting_order() {
        let (ledger, _) = fold_one(&[
            snap("c1", 1, vec![open("B"), open("A")]),
            snap("c2", 2, vec![open("C"), open("A")]),
        ]);
        let keys: Vec<_> = ledger.records().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["B", "A", "C"]);
    }

    #[test]
    fn foreign_snapshot_is_not_applied() {
        let mut ledger = SampleLedger::new("s");
        let mut diags = Diagnostics::new();
        let other = Snapshot::new("t", "x", day(1), Issues::Present(vec![open("K")]));
        ledger.apply(&other, &mut diags);
        assert!(ledger.is_empty());
        assert_eq!(ledger.stats().snapshots, 0);
    }
}
