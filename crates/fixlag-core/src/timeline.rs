//! Per-sample commit index for resolver lookahead.
//!
//! A [`SampleTimeline`] is the ordered commit sequence of one sample plus a
//! hash → position map, built once so each lookahead is O(1). Absent
//! snapshots are indexed like any other: a commit whose scan failed is still
//! the next commit in history.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::model::Snapshot;

/// One position in a sample's commit sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    pub hash: String,
    pub date: NaiveDate,
    /// Author of the snapshot's first finding, if it had any.
    pub first_author: Option<String>,
}

/// Ordered commits of a single sample.
#[derive(Debug, Clone, Default)]
pub struct SampleTimeline {
    sample: String,
    commits: Vec<CommitEntry>,
    positions: HashMap<String, usize>,
    repeated: HashSet<String>,
}

impl SampleTimeline {
    #[must_use]
    pub fn new(sample: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            commits: Vec::new(),
            positions: HashMap::new(),
            repeated: HashSet::new(),
        }
    }

    /// Build from a sample's snapshots in log order.
    ///
    /// Snapshots of other samples are ignored.
    #[must_use]
    pub fn from_snapshots<'a>(
        sample: &str,
        snapshots: impl IntoIterator<Item = &'a Snapshot>,
    ) -> Self {
        let mut timeline = Self::new(sample);
        for snapshot in snapshots {
            if snapshot.sample == sample {
                timeline.push(snapshot);
            }
        }
        timeline
    }

    /// Append the next commit.
    ///
    /// A hash seen before keeps its first position and is marked repeated;
    /// the repeat still occupies a slot in the sequence.
    pub fn push(&mut self, snapshot: &Snapshot) {
        let position = self.commits.len();
        if self.positions.contains_key(&snapshot.commit_hash) {
            self.repeated.insert(snapshot.commit_hash.clone());
        } else {
            self.positions.insert(snapshot.commit_hash.clone(), position);
        }
        self.commits.push(CommitEntry {
            hash: snapshot.commit_hash.clone(),
            date: snapshot.commit_date,
            first_author: snapshot.first_author().map(ToString::to_string),
        });
    }

    #[must_use]
    pub fn sample(&self) -> &str {
        &self.sample
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    #[must_use]
    pub fn position(&self, hash: &str) -> Option<usize> {
        self.positions.get(hash).copied()
    }

    /// Whether `hash` occupies more than one position.
    #[must_use]
    pub fn is_repeated(&self, hash: &str) -> bool {
        self.repeated.contains(hash)
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<&CommitEntry> {
        self.commits.get(position)
    }

    /// The commit right after `hash`, or `None` if `hash` is unknown or last.
    #[must_use]
    pub fn next_after(&self, hash: &str) -> Option<&CommitEntry> {
        self.position(hash)
            .and_then(|position| self.commits.get(position + 1))
    }
}

/// Timelines for every sample of a run.
#[derive(Debug, Clone, Default)]
pub struct TimelineIndex {
    samples: HashMap<String, SampleTimeline>,
}

impl TimelineIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index snapshots in log order, one timeline per sample.
    #[must_use]
    pub fn build<'a>(snapshots: impl IntoIterator<Item = &'a Snapshot>) -> Self {
        let mut index = Self::new();
        for snapshot in snapshots {
            index
                .samples
                .entry(snapshot.sample.clone())
                .or_insert_with(|| SampleTimeline::new(snapshot.sample.clone()))
                .push(snapshot);
        }
        index
    }

    pub fn insert(&mut self, timeline: SampleTimeline) {
        self.samples.insert(timeline.sample.clone(), timeline);
    }

    #[must_use]
    pub fn get(&self, sample: &str) -> Option<&SampleTimeline> {
        self.samples.get(sample)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
