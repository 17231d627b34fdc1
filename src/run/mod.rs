//! Orchestrates a single scheduled backup run.
//!
//! The run lists the region's volumes, applies the tag-matching policy,
//! snapshots every eligible volume, and, when a retention window is
//! configured, prunes expired snapshots of the selected volumes. Nothing is
//! carried over between runs.

use std::fmt;
use std::io::Write;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::BackupConfig;
use crate::lifecycle::{BackupError, PruneOutcome, SnapshotLifecycle};
use crate::provider::SnapshotProvider;
use crate::selector::{Selection, VolumeSelector};

/// Counts reported once a run completes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    /// Volumes selected for backup.
    pub eligible_volumes: usize,
    /// Snapshots created.
    pub created_snapshots: usize,
    /// Snapshots deleted (or reported for removal in check mode).
    pub deleted_snapshots: usize,
    /// Snapshots kept by the retention policy.
    pub retained_snapshots: usize,
    /// Whether the run was a dry run.
    pub check: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.check { "check" } else { "apply" };
        write!(
            f,
            "backup run complete ({mode}): eligible_volumes={}, created_snapshots={}, deleted_snapshots={}, retained_snapshots={}",
            self.eligible_volumes,
            self.created_snapshots,
            self.deleted_snapshots,
            self.retained_snapshots
        )
    }
}

/// Runs selection, creation, and retention against one provider.
#[derive(Clone, Debug)]
pub struct BackupRun<P> {
    selector: VolumeSelector,
    lifecycle: SnapshotLifecycle<P>,
    retention_days: Option<u32>,
}

impl<P: SnapshotProvider> BackupRun<P> {
    /// Creates a run from a validated configuration.
    #[must_use]
    pub fn new(config: &BackupConfig, provider: P) -> Self {
        Self {
            selector: VolumeSelector::new(config.word.trim()),
            lifecycle: SnapshotLifecycle::new(provider, config.check),
            retention_days: config.days,
        }
    }

    /// Overrides the instant used for snapshot ages.
    #[must_use]
    pub fn with_now(self, now: DateTime<Utc>) -> Self {
        Self {
            lifecycle: self.lifecycle.with_now(now),
            ..self
        }
    }

    /// Executes the run, writing check-mode decisions to `out`.
    ///
    /// # Errors
    ///
    /// Returns the first [`BackupError`] raised by a provider call or by
    /// writing to `out`; remaining work is abandoned.
    pub fn execute<W: Write>(&self, out: &mut W) -> Result<RunSummary, BackupError<P::Error>> {
        let check = self.lifecycle.is_check();
        info!(word = self.selector.word(), check, "starting backup run");

        let volumes = self
            .lifecycle
            .provider()
            .list_volumes(None)
            .map_err(BackupError::ListVolumes)?;
        let selection = self.selector.select(&volumes);
        info!(
            listed = volumes.len(),
            eligible = selection.eligible.len(),
            "selected volumes"
        );
        self.report_exclusions(&selection, out)?;

        let created_snapshots = self.lifecycle.create_backups(&selection.eligible, out)?;

        let pruned = match self.retention_days {
            Some(days) => self.apply_retention(&selection, days, out)?,
            None => {
                debug!("no retention window configured");
                PruneOutcome::default()
            }
        };

        Ok(RunSummary {
            eligible_volumes: selection.eligible.len(),
            created_snapshots,
            deleted_snapshots: pruned.deleted,
            retained_snapshots: pruned.retained,
            check,
        })
    }

    fn report_exclusions<W: Write>(
        &self,
        selection: &Selection,
        out: &mut W,
    ) -> Result<(), BackupError<P::Error>> {
        for exclusion in &selection.excluded {
            debug!(volume_id = %exclusion.volume_id, reason = ?exclusion.reason, "volume excluded");
            if self.lifecycle.is_check() {
                writeln!(out, "{exclusion}").map_err(|err| BackupError::report(&err))?;
            }
        }
        Ok(())
    }

    fn apply_retention<W: Write>(
        &self,
        selection: &Selection,
        days: u32,
        out: &mut W,
    ) -> Result<PruneOutcome, BackupError<P::Error>> {
        if selection.is_empty() {
            info!("no volumes selected; skipping retention");
            return Ok(PruneOutcome::default());
        }

        let snapshots = self
            .lifecycle
            .provider()
            .list_snapshots(&selection.volume_ids())
            .map_err(BackupError::ListSnapshots)?;
        let scoped = snapshots
            .into_iter()
            .filter(|snapshot| selection.contains(&snapshot.volume_id))
            .collect::<Vec<_>>();
        info!(snapshots = scoped.len(), days, "applying retention");
        self.lifecycle.prune(&scoped, days, out)
    }
}
