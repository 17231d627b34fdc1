//! Core library for the `ec2backup` scheduled snapshot tool.
//!
//! A run selects the region's block-storage volumes whose tags carry a backup
//! word, snapshots each of them, and optionally prunes snapshots of those
//! volumes that have outlived a retention window. Provider access sits behind
//! [`SnapshotProvider`], implemented by [`AwsCliProvider`] for production use.

pub mod command;
pub mod config;
pub mod lifecycle;
pub mod provider;
pub mod run;
pub mod selector;
pub mod test_support;

pub use command::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use config::{BackupConfig, ConfigError, ConfigOverrides};
pub use lifecycle::{BackupError, PruneOutcome, RetentionPolicy, SnapshotLifecycle};
pub use provider::{
    AwsCliProvider, AwsCliSettings, ProviderError, Snapshot, SnapshotProvider, Tag, Volume,
};
pub use run::{BackupRun, RunSummary};
pub use selector::{Selection, VolumeSelector, select};
