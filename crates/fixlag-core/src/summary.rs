//! Run summary for a reconstruction.
//!
//! Aggregate counts over the emitted records plus per-kind anomaly counts.
//! Everything here is derived; nothing feeds back into the records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::diagnostics::{AnomalyKind, Diagnostics};
use crate::model::{LifecycleRecord, Resolution};

/// Totals for one `reconstruct` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconstructionSummary {
    pub samples: usize,
    pub snapshots: usize,
    /// Snapshots whose payload was missing or could not be parsed.
    pub absent_snapshots: usize,
    /// Log rows that could not become a snapshot at all.
    pub rejected_rows: usize,
    pub records: usize,
    pub fixed: usize,
    pub resolved_next_commit: usize,
    pub still_open: usize,
    /// Mean of all present `fix_duration` values, in days.
    pub mean_fix_duration: Option<f64>,
    /// Median of all present `fix_duration` values, in days.
    pub median_fix_duration: Option<f64>,
    pub anomalies: BTreeMap<AnomalyKind, usize>,
}

impl ReconstructionSummary {
    /// Tally records and diagnostics.
    ///
    /// `samples`, `snapshots`, `absent_snapshots` and `rejected_rows` describe
    /// the input and are filled in by the caller.
    #[must_use]
    pub fn tally(records: &[LifecycleRecord], diagnostics: &Diagnostics) -> Self {
        let mut summary = Self {
            records: records.len(),
            anomalies: diagnostics.counts(),
            ..Self::default()
        };

        let mut durations = Vec::new();
        for record in records {
            match record.resolution() {
                Resolution::Fixed => summary.fixed += 1,
                Resolution::NextCommit => summary.resolved_next_commit += 1,
                Resolution::Open => summary.still_open += 1,
            }
            if let Some(days) = record.fix_duration {
                durations.push(days);
            }
        }

        summary.mean_fix_duration = mean(&durations);
        summary.median_fix_duration = median(&mut durations);
        summary
    }

    /// Total anomalies across all kinds.
    #[must_use]
    pub fn anomaly_total(&self) -> usize {
        self.anomalies.values().sum()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let total: i64 = values.iter().sum();
    Some(total as f64 / values.len() as f64)
}

#[allow(clippy::cast_precision_loss)]
fn median(values: &mut [i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) as f64 / 2.0)
    } else {
        Some(values[mid] as f64)
    }
}
