//! BDD scenarios for scheduled snapshot runs.

use rstest_bdd_macros::scenario;

use super::test_helpers::{SnapshotContext, snapshot_context};

#[scenario(
    path = "tests/features/snapshots.feature",
    name = "Back up tagged volumes and prune expired snapshots"
)]
fn scenario_backup_and_prune(snapshot_context: SnapshotContext) {
    let _ = snapshot_context;
}

#[scenario(
    path = "tests/features/snapshots.feature",
    name = "Dry run reports decisions without changing anything"
)]
fn scenario_dry_run(snapshot_context: SnapshotContext) {
    let _ = snapshot_context;
}

#[scenario(path = "tests/features/snapshots.feature", name = "Surface aws failures")]
fn scenario_surface_failures(snapshot_context: SnapshotContext) {
    let _ = snapshot_context;
}
