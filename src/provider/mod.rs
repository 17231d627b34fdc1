//! Provider abstraction for volume discovery and snapshot management.
//!
//! The backup policy only needs five operations from the cloud provider. They
//! are gathered behind [`SnapshotProvider`] so the policy can be driven by the
//! AWS CLI in production and by an in-memory recorder in tests.

use std::collections::BTreeMap;

mod aws_cli;
mod error;
mod types;

pub use aws_cli::{AwsCliProvider, AwsCliSettings, DEFAULT_AWS_BIN};
pub use error::ProviderError;
pub use types::{Snapshot, Tag, Volume};

/// Operations the backup run requires from a cloud provider.
///
/// Every call is blocking and returns once the provider has answered.
/// Authentication, profile, and region selection are the implementation's
/// concern.
pub trait SnapshotProvider {
    /// Provider-specific error type.
    type Error: std::error::Error + 'static;

    /// Lists volumes in the configured region.
    ///
    /// When `tag_value_filter` is set the provider may restrict the result to
    /// volumes carrying a tag value containing it. Callers must not rely on
    /// the filter for correctness.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the listing fails.
    fn list_volumes(&self, tag_value_filter: Option<&str>) -> Result<Vec<Volume>, Self::Error>;

    /// Lists snapshots taken from any of the given volumes.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the listing fails.
    fn list_snapshots(&self, volume_ids: &[String]) -> Result<Vec<Snapshot>, Self::Error>;

    /// Starts a snapshot of `volume_id` and returns the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the snapshot cannot be created.
    fn create_snapshot(&self, volume_id: &str, description: &str)
    -> Result<Snapshot, Self::Error>;

    /// Attaches `tags` to the resource identified by `resource_id`.
    ///
    /// # Errors
    ///
    /// Returns the provider error when tagging fails.
    fn apply_tags(
        &self,
        resource_id: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), Self::Error>;

    /// Deletes a snapshot.
    ///
    /// # Errors
    ///
    /// Returns the provider error when deletion fails.
    fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), Self::Error>;
}
