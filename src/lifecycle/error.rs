//! Errors surfaced by a backup run.

use thiserror::Error;

/// Errors raised while creating or pruning snapshots.
///
/// Each variant names the operation and the resource involved; the first
/// error aborts the run.
#[derive(Debug, Error)]
pub enum BackupError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    /// Raised when volumes cannot be listed.
    #[error("failed to list volumes: {0}")]
    ListVolumes(#[source] ProviderError),
    /// Raised when a snapshot of an eligible volume cannot be created.
    #[error("failed to create snapshot of volume {volume_id}: {source}")]
    CreateSnapshot {
        /// Volume being backed up.
        volume_id: String,
        /// Provider-specific error.
        #[source]
        source: ProviderError,
    },
    /// Raised when a freshly created snapshot cannot be tagged.
    #[error("failed to tag snapshot {snapshot_id} of volume {volume_id}: {source}")]
    ApplyTags {
        /// Snapshot that was being tagged.
        snapshot_id: String,
        /// Volume the snapshot was taken from.
        volume_id: String,
        /// Provider-specific error.
        #[source]
        source: ProviderError,
    },
    /// Raised when snapshots of the selected volumes cannot be listed.
    #[error("failed to list snapshots: {0}")]
    ListSnapshots(#[source] ProviderError),
    /// Raised when an expired snapshot cannot be deleted.
    #[error("failed to delete snapshot {snapshot_id}: {source}")]
    DeleteSnapshot {
        /// Snapshot being deleted.
        snapshot_id: String,
        /// Provider-specific error.
        #[source]
        source: ProviderError,
    },
    /// Raised when the console report cannot be written.
    #[error("failed to write report: {0}")]
    Report(String),
}

impl<ProviderError> BackupError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    pub(crate) fn report(err: &std::io::Error) -> Self {
        Self::Report(err.to_string())
    }
}
