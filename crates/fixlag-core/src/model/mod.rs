//! Domain model: findings, snapshots and lifecycle records.

pub mod finding;
pub mod record;
pub mod snapshot;

pub use finding::{Finding, FindingStatus, TextRange};
pub use record::{LifecycleRecord, Resolution};
pub use snapshot::{Issues, Snapshot};

use chrono::NaiveDate;

/// Whole days from `from` to `to`. Negative when `to` precedes `from`.
#[must_use]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_between_counts_calendar_days() {
        let a = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert_eq!(days_between(a, b), 4);
        assert_eq!(days_between(b, a), -4);
        assert_eq!(days_between(a, a), 0);
    }
}
