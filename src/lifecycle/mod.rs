//! Snapshot creation and retention.
//!
//! [`SnapshotLifecycle`] owns the provider, the global dry-run flag, and the
//! instant used for every age computation in the run. Each mutating call
//! checks the dry-run flag first; in check mode the decision is written to the
//! console sink instead.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::provider::{Snapshot, SnapshotProvider};
use crate::selector::NAME_TAG_KEY;

mod error;
mod retention;

pub use error::BackupError;
pub use retention::{RetentionDecision, RetentionPolicy, RetentionVerdict, age_in_days};

/// Suffix shared by snapshot descriptions and name tags.
pub const SNAPSHOT_LABEL: &str = "ec2backup";

/// Header printed before the volume list in check mode.
pub const CHECK_MODE_HEADER: &str = "Volume Ids that snapshots will be created for:";

/// Description attached to a snapshot of `volume_id`.
#[must_use]
pub fn snapshot_description(volume_id: &str) -> String {
    format!("Scheduled Snapshot [{volume_id}] - {SNAPSHOT_LABEL}")
}

/// Value of the `Name` tag applied to a snapshot of a volume named
/// `display_name`.
#[must_use]
pub fn snapshot_name(display_name: &str) -> String {
    format!("{SNAPSHOT_LABEL} - {display_name}")
}

/// Counts produced by the retention phase.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PruneOutcome {
    /// Snapshots deleted, or reported as to be removed in check mode.
    pub deleted: usize,
    /// Snapshots kept.
    pub retained: usize,
}

/// Creates snapshots of eligible volumes and prunes expired ones.
#[derive(Clone, Debug)]
pub struct SnapshotLifecycle<P> {
    provider: P,
    check: bool,
    now: DateTime<Utc>,
}

impl<P: SnapshotProvider> SnapshotLifecycle<P> {
    /// Creates a lifecycle that captures the current instant once.
    #[must_use]
    pub fn new(provider: P, check: bool) -> Self {
        Self {
            provider,
            check,
            now: Utc::now(),
        }
    }

    /// Overrides the instant used for age computation.
    #[must_use]
    pub const fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Instant ages are measured against.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Returns `true` in dry-run mode.
    #[must_use]
    pub const fn is_check(&self) -> bool {
        self.check
    }

    /// Provider backing this lifecycle.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Snapshots every eligible volume and names the result after it.
    ///
    /// `eligible` maps volume ids to display names. Volumes are processed
    /// one at a time in id order. In check mode only the volume ids are
    /// written to `out`.
    ///
    /// The first failed create or tag call aborts the phase: volumes after
    /// the failing one are not snapshotted in this run, and a snapshot whose
    /// tagging failed is left untagged. Nothing is retried or rolled back;
    /// the error names the volume (and snapshot) so the run can be repeated.
    ///
    /// Returns the number of snapshots created.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::CreateSnapshot`] or [`BackupError::ApplyTags`]
    /// when a provider call fails, and [`BackupError::Report`] when `out`
    /// cannot be written.
    pub fn create_backups<W: Write>(
        &self,
        eligible: &BTreeMap<String, String>,
        out: &mut W,
    ) -> Result<usize, BackupError<P::Error>> {
        if self.check {
            writeln!(out, "{CHECK_MODE_HEADER}").map_err(|err| BackupError::report(&err))?;
            for volume_id in eligible.keys() {
                writeln!(out, "{volume_id}").map_err(|err| BackupError::report(&err))?;
            }
            return Ok(0);
        }

        let mut created = 0;
        for (volume_id, display_name) in eligible {
            self.backup_volume(volume_id, display_name)?;
            created += 1;
        }
        Ok(created)
    }

    fn backup_volume(
        &self,
        volume_id: &str,
        display_name: &str,
    ) -> Result<(), BackupError<P::Error>> {
        let snapshot = self
            .provider
            .create_snapshot(volume_id, &snapshot_description(volume_id))
            .map_err(|source| BackupError::CreateSnapshot {
                volume_id: volume_id.to_owned(),
                source,
            })?;

        let tags = BTreeMap::from([(NAME_TAG_KEY.to_owned(), snapshot_name(display_name))]);
        self.provider
            .apply_tags(&snapshot.snapshot_id, &tags)
            .map_err(|source| BackupError::ApplyTags {
                snapshot_id: snapshot.snapshot_id.clone(),
                volume_id: volume_id.to_owned(),
                source,
            })?;

        info!(
            volume_id,
            snapshot_id = %snapshot.snapshot_id,
            "created snapshot"
        );
        Ok(())
    }

    /// Deletes snapshots strictly older than `retention_days`.
    ///
    /// Every snapshot passed in is evaluated; callers scope the set to the
    /// volumes selected for this run. In check mode every decision is
    /// written to `out` and nothing is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::DeleteSnapshot`] when a deletion fails and
    /// [`BackupError::Report`] when `out` cannot be written.
    pub fn prune<W: Write>(
        &self,
        snapshots: &[Snapshot],
        retention_days: u32,
        out: &mut W,
    ) -> Result<PruneOutcome, BackupError<P::Error>> {
        let policy = RetentionPolicy::new(retention_days);
        let mut outcome = PruneOutcome::default();

        for snapshot in snapshots {
            let verdict = policy.evaluate(snapshot, self.now);
            match verdict.decision {
                RetentionDecision::Remove => {
                    self.remove_snapshot(snapshot, verdict.age_days, retention_days, out)?;
                    outcome.deleted += 1;
                }
                RetentionDecision::Keep => {
                    debug!(
                        snapshot_id = %snapshot.snapshot_id,
                        age_days = verdict.age_days,
                        retention_days,
                        "retaining snapshot"
                    );
                    if self.check {
                        writeln!(out, "{}", keep_message(snapshot, verdict.age_days, retention_days))
                            .map_err(|err| BackupError::report(&err))?;
                    }
                    outcome.retained += 1;
                }
            }
        }
        Ok(outcome)
    }

    fn remove_snapshot<W: Write>(
        &self,
        snapshot: &Snapshot,
        age_days: i64,
        retention_days: u32,
        out: &mut W,
    ) -> Result<(), BackupError<P::Error>> {
        if self.check {
            return writeln!(out, "{}", remove_message(snapshot, age_days, retention_days))
                .map_err(|err| BackupError::report(&err));
        }

        self.provider
            .delete_snapshot(&snapshot.snapshot_id)
            .map_err(|source| BackupError::DeleteSnapshot {
                snapshot_id: snapshot.snapshot_id.clone(),
                source,
            })?;
        info!(
            snapshot_id = %snapshot.snapshot_id,
            volume_id = %snapshot.volume_id,
            age_days,
            "deleted snapshot"
        );
        Ok(())
    }
}

fn remove_message(snapshot: &Snapshot, age_days: i64, retention_days: u32) -> String {
    format!(
        "Snapshot [{}] of volume [{}]: Will be removed. Reason: The snapshot is {age_days} days old, which is more than the specified {retention_days} days.",
        snapshot.snapshot_id, snapshot.volume_id
    )
}

fn keep_message(snapshot: &Snapshot, age_days: i64, retention_days: u32) -> String {
    format!(
        "Snapshot [{}] of volume [{}]: Will NOT be deleted. Reason: The snapshot is {age_days} days old, which is not more than the specified {retention_days} days.",
        snapshot.snapshot_id, snapshot.volume_id
    )
}
