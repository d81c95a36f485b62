//! Fix-window resolver.
//!
//! After the fold, an issue that was never reported `FIXED` but was seen
//! `OPEN` again is attributed to the commit immediately after its last `OPEN`
//! observation, within the same sample's timeline.
//!
//! # Algorithm
//!
//! For each record with no `closed_date` and a `latest_open_hash`:
//!
//! 1. Look up `latest_open_hash` in the sample's [`SampleTimeline`](crate::timeline::SampleTimeline).
//!    A hash that is missing, or that occurs more than once, is unresolvable.
//! 2. If a next commit exists, take its hash and date, compute
//!    `days(next_date - open_date)` and the author of its first finding.
//! 3. Discard the whole resolution if that duration is negative.
//! 4. Leave the record alone if the commit is the last of its sample.
//!
//! Each lookup is O(1) against the prebuilt index.

use tracing::trace;

use crate::diagnostics::{Anomaly, AnomalyKind, Diagnostics};
use crate::model::{LifecycleRecord, days_between};
use crate::timeline::TimelineIndex;

/// What happened to one record during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Already closed by the ledger, or never seen open again.
    NotApplicable,
    /// Resolver fields were filled from the next commit.
    Resolved,
    /// The latest open commit is the last of its sample.
    StillOpen,
    /// Lookahead failed; the record keeps empty resolver fields.
    Unresolvable(AnomalyKind),
}

/// Counters for a resolver pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub resolved: usize,
    pub still_open: usize,
    pub unresolvable: usize,
}

/// Resolves open records against prebuilt sample timelines.
#[derive(Debug, Clone, Copy)]
pub struct FixWindowResolver<'idx> {
    index: &'idx TimelineIndex,
}

impl<'idx> FixWindowResolver<'idx> {
    #[must_use]
    pub const fn new(index: &'idx TimelineIndex) -> Self {
        Self { index }
    }

    /// Resolve every eligible record in place.
    pub fn resolve_all(
        &self,
        records: &mut [LifecycleRecord],
        diagnostics: &mut Diagnostics,
    ) -> ResolveStats {
        let mut stats = ResolveStats::default();
        for record in records {
            match self.resolve(record, diagnostics) {
                Outcome::Resolved => stats.resolved += 1,
                Outcome::StillOpen => stats.still_open += 1,
                Outcome::Unresolvable(_) => stats.unresolvable += 1,
                Outcome::NotApplicable => {}
            }
        }
        stats
    }

    /// Resolve a single record.
    pub fn resolve(&self, record: &mut LifecycleRecord, diagnostics: &mut Diagnostics) -> Outcome {
        if record.is_closed() {
            return Outcome::NotApplicable;
        }
        let Some(latest_open) = record.latest_open_hash.clone() else {
            return Outcome::NotApplicable;
        };

        record.clear_resolver_fields();

        let Some(timeline) = self.index.get(&record.sample) else {
            diagnostics.record(
                Anomaly::new(
                    AnomalyKind::MissingSampleContext,
                    record.sample.clone(),
                    "no commit index for sample",
                )
                .for_key(record.key.clone()),
            );
            return Outcome::Unresolvable(AnomalyKind::MissingSampleContext);
        };

        let Some(position) = timeline.position(&latest_open) else {
            diagnostics.record(
                Anomaly::new(
                    AnomalyKind::UnresolvableLookahead,
                    record.sample.clone(),
                    "latest open commit is not in the sample's commit index",
                )
                .at_commit(latest_open)
                .for_key(record.key.clone()),
            );
            return Outcome::Unresolvable(AnomalyKind::UnresolvableLookahead);
        };

        if timeline.is_repeated(&latest_open) {
            diagnostics.record(
                Anomaly::new(
                    AnomalyKind::UnresolvableLookahead,
                    record.sample.clone(),
                    "latest open commit occurs more than once in the sample; next commit is ambiguous",
                )
                .at_commit(latest_open)
                .for_key(record.key.clone()),
            );
            return Outcome::Unresolvable(AnomalyKind::UnresolvableLookahead);
        }

        let Some(next) = timeline.get(position + 1) else {
            trace!(sample = %record.sample, key = %record.key, "open as of last commit");
            return Outcome::StillOpen;
        };

        let days = days_between(record.open_date, next.date);
        if days < 0 {
            diagnostics.record(
                Anomaly::new(
                    AnomalyKind::NegativeDuration,
                    record.sample.clone(),
                    format!(
                        "next commit dated {} precedes open on {}; resolution discarded",
                        next.date, record.open_date
                    ),
                )
                .at_commit(next.hash.clone())
                .for_key(record.key.clone()),
            );
            return Outcome::Unresolvable(AnomalyKind::NegativeDuration);
        }

        record.next_commit_hash = Some(next.hash.clone());
        record.next_commit_date = Some(next.date);
        record.author_next_commit.clone_from(&next.first_author);
        record.fix_duration = Some(days);
        Outcome::Resolved
    }
}
