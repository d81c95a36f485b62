//! End-to-end reconstruction: partition, fold, resolve, summarize.
//!
//! Samples never share state, so each one runs through its own timeline,
//! ledger and resolver. With the `parallel` feature and
//! [`ReconstructOptions::parallel`] set, samples are processed on the rayon
//! pool; the output is identical to the sequential run.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info};

use crate::diagnostics::Diagnostics;
use crate::ledger::{FoldStats, SampleLedger};
use crate::loader::LoadReport;
use crate::model::{LifecycleRecord, Snapshot};
use crate::resolver::{FixWindowResolver, ResolveStats};
use crate::summary::ReconstructionSummary;
use crate::timeline::{SampleTimeline, TimelineIndex};

/// Knobs for [`reconstruct`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructOptions {
    /// Process independent samples concurrently. Ignored without the
    /// `parallel` feature.
    pub parallel: bool,
}

/// The output of a reconstruction run.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Samples in first-appearance order; records in first-sighting order.
    pub records: Vec<LifecycleRecord>,
    pub diagnostics: Diagnostics,
    pub summary: ReconstructionSummary,
}

/// One sample's snapshots, in log order.
#[derive(Debug, Clone)]
pub struct SamplePartition<'a> {
    pub sample: &'a str,
    pub snapshots: Vec<&'a Snapshot>,
}

/// Everything one sample produced.
#[derive(Debug, Clone, Default)]
struct SampleOutcome {
    records: Vec<LifecycleRecord>,
    diagnostics: Diagnostics,
    fold: FoldStats,
    resolve: ResolveStats,
}

/// Split snapshots by sample, in order of each sample's first appearance.
#[must_use]
pub fn partition(snapshots: &[Snapshot]) -> Vec<SamplePartition<'_>> {
    let mut partitions: Vec<SamplePartition<'_>> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for snapshot in snapshots {
        let slot = *slots.entry(snapshot.sample.as_str()).or_insert_with(|| {
            partitions.push(SamplePartition {
                sample: &snapshot.sample,
                snapshots: Vec::new(),
            });
            partitions.len() - 1
        });
        partitions[slot].snapshots.push(snapshot);
    }
    partitions
}

fn process_sample(partition: &SamplePartition<'_>) -> SampleOutcome {
    let mut diagnostics = Diagnostics::new();

    let mut index = TimelineIndex::new();
    index.insert(SampleTimeline::from_snapshots(
        partition.sample,
        partition.snapshots.iter().copied(),
    ));

    let mut ledger = SampleLedger::new(partition.sample);
    for snapshot in &partition.snapshots {
        ledger.apply(snapshot, &mut diagnostics);
    }
    let fold = ledger.stats();

    let mut records = ledger.into_records();
    let resolve = FixWindowResolver::new(&index).resolve_all(&mut records, &mut diagnostics);

    debug!(
        sample = partition.sample,
        snapshots = fold.snapshots,
        records = records.len(),
        closed = fold.closed,
        resolved = resolve.resolved,
        "sample reconstructed"
    );

    SampleOutcome {
        records,
        diagnostics,
        fold,
        resolve,
    }
}

#[cfg(feature = "parallel")]
fn process_all(partitions: &[SamplePartition<'_>], parallel: bool) -> Vec<SampleOutcome> {
    use rayon::prelude::*;

    if parallel {
        partitions.par_iter().map(process_sample).collect()
    } else {
        partitions.iter().map(process_sample).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn process_all(partitions: &[SamplePartition<'_>], _parallel: bool) -> Vec<SampleOutcome> {
    partitions.iter().map(process_sample).collect()
}

/// Reconstruct lifecycle records from snapshots in log order.
#[must_use]
pub fn reconstruct(snapshots: &[Snapshot], options: &ReconstructOptions) -> Reconstruction {
    reconstruct_with(snapshots, Diagnostics::new(), 0, options)
}

/// Reconstruct from a loaded log, carrying its diagnostics and rejected rows
/// into the result.
#[must_use]
pub fn reconstruct_loaded(load: &LoadReport, options: &ReconstructOptions) -> Reconstruction {
    reconstruct_with(
        &load.snapshots,
        load.diagnostics.clone(),
        load.bad_lines.len(),
        options,
    )
}

fn reconstruct_with(
    snapshots: &[Snapshot],
    mut diagnostics: Diagnostics,
    rejected_rows: usize,
    options: &ReconstructOptions,
) -> Reconstruction {
    let start = Instant::now();
    let partitions = partition(snapshots);
    let outcomes = process_all(&partitions, options.parallel);

    let mut records = Vec::with_capacity(outcomes.iter().map(|o| o.records.len()).sum());
    let mut absent = 0;
    let mut resolved = 0;
    for outcome in outcomes {
        absent += outcome.fold.absent;
        resolved += outcome.resolve.resolved;
        records.extend(outcome.records);
        diagnostics.merge(outcome.diagnostics);
    }

    let mut summary = ReconstructionSummary::tally(&records, &diagnostics);
    summary.samples = partitions.len();
    summary.snapshots = snapshots.len();
    summary.absent_snapshots = absent;
    summary.rejected_rows = rejected_rows;

    info!(
        samples = summary.samples,
        snapshots = summary.snapshots,
        records = summary.records,
        resolved,
        anomalies = diagnostics.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "reconstruction complete"
    );

    Reconstruction {
        records,
        diagnostics,
        summary,
    }
}
