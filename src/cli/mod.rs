//! Command-line interface definitions for the `ec2backup` binary.
//!
//! This module centralises the clap parser so both the main binary and the
//! build script can reuse it when generating the manual page. It must not
//! depend on library items.

use clap::Parser;

/// Top-level CLI for the `ec2backup` binary.
#[derive(Debug, Parser)]
#[command(
    name = "ec2backup",
    version,
    about = "Snapshot tagged EC2 volumes and prune expired snapshots"
)]
pub(crate) struct Cli {
    /// Report what would be created and removed without changing anything.
    #[arg(short = 'c', long)]
    pub(crate) check: bool,
    /// Credential profile used for every provider call.
    #[arg(short = 'p', long, value_name = "PROFILE")]
    pub(crate) profile: Option<String>,
    /// Region to operate in.
    #[arg(short = 'r', long, value_name = "REGION")]
    pub(crate) region: Option<String>,
    /// Substring searched for in volume tag values (case-insensitive).
    #[arg(short = 'w', long, value_name = "WORD")]
    pub(crate) word: Option<String>,
    /// Delete snapshots of selected volumes older than this many days.
    ///
    /// A snapshot exactly this many days old is kept. Without this flag no
    /// snapshot is deleted.
    #[arg(short = 'd', long, value_name = "DAYS")]
    pub(crate) days: Option<u32>,
    /// Path to the `aws` executable.
    #[arg(long, value_name = "PATH")]
    pub(crate) aws_bin: Option<String>,
}
