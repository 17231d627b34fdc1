//! Age-based retention policy.

use chrono::{DateTime, Utc};

use crate::provider::Snapshot;

/// Whole days elapsed between `created_at` and `now`.
///
/// Partial days truncate toward zero, so a snapshot taken 23 hours ago is
/// zero days old. Both instants are UTC, which rules out naive/aware
/// mismatches.
#[must_use]
pub fn age_in_days(now: DateTime<Utc>, created_at: DateTime<Utc>) -> i64 {
    (now - created_at).num_days()
}

/// What happens to a snapshot under the retention policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetentionDecision {
    /// The snapshot is strictly older than the window and is deleted.
    Remove,
    /// The snapshot is within the window and is kept.
    Keep,
}

/// Decision for one snapshot together with the age it was based on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetentionVerdict {
    /// Age of the snapshot in whole days.
    pub age_days: i64,
    /// Resulting decision.
    pub decision: RetentionDecision,
}

/// Deletes snapshots strictly older than a number of days.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetentionPolicy {
    days: u32,
}

impl RetentionPolicy {
    /// Creates a policy keeping snapshots for `days` days.
    #[must_use]
    pub const fn new(days: u32) -> Self {
        Self { days }
    }

    /// Retention window in days.
    #[must_use]
    pub const fn days(&self) -> u32 {
        self.days
    }

    /// Decides the fate of a snapshot of the given age. A snapshot exactly
    /// at the boundary is kept.
    #[must_use]
    pub fn decide(&self, age_days: i64) -> RetentionDecision {
        if age_days > i64::from(self.days) {
            RetentionDecision::Remove
        } else {
            RetentionDecision::Keep
        }
    }

    /// Computes the age of `snapshot` at `now` and decides its fate.
    #[must_use]
    pub fn evaluate(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> RetentionVerdict {
        let age_days = age_in_days(now, snapshot.created_at);
        RetentionVerdict {
            age_days,
            decision: self.decide(age_days),
        }
    }
}
