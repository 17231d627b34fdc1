//! BDD step definitions for scheduled snapshot runs.

use ec2backup::test_support::{json_snapshot, json_snapshots, json_volumes};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{RunOutcome, SnapshotContext};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a backup run for word \"{word}\" keeping {days:u32} days")]
fn backup_run(snapshot_context: &SnapshotContext, word: String, days: u32) {
    snapshot_context.configure(word.trim(), days, false);
}

#[given("a dry-run backup for word \"{word}\" keeping {days:u32} days")]
fn dry_run_backup(snapshot_context: &SnapshotContext, word: String, days: u32) {
    snapshot_context.configure(word.trim(), days, true);
}

#[given("aws lists volume \"{volume_id}\" named \"{name}\" tagged \"{schedule}\" and a weekly volume \"{other_id}\"")]
fn aws_lists_volumes(
    snapshot_context: &SnapshotContext,
    volume_id: String,
    name: String,
    schedule: String,
    other_id: String,
) {
    snapshot_context.runner.push_output(
        Some(0),
        json_volumes(&[
            (
                volume_id.as_str(),
                &[("Name", name.as_str()), ("Schedule", schedule.as_str())],
            ),
            (other_id.as_str(), &[("Schedule", "weekly")]),
        ]),
        "",
    );
}

#[given("aws creates snapshot \"{snapshot_id}\" of volume \"{volume_id}\"")]
fn aws_creates_snapshot(snapshot_context: &SnapshotContext, snapshot_id: String, volume_id: String) {
    snapshot_context.runner.push_output(
        Some(0),
        json_snapshot(&snapshot_id, &volume_id, snapshot_context.now),
        "",
    );
    snapshot_context.runner.push_success(); // create-tags
}

#[given("aws rejects snapshot creation with \"{code}\"")]
fn aws_rejects_creation(snapshot_context: &SnapshotContext, code: String) {
    snapshot_context.runner.push_output(
        Some(254),
        "",
        format!("An error occurred ({code}) when calling the CreateSnapshot operation\n"),
    );
}

#[given("aws lists snapshot \"{old_id}\" aged {old_age:u32} days and snapshot \"{recent_id}\" aged {recent_age:u32} days of volume \"{volume_id}\"")]
fn aws_lists_snapshots(
    snapshot_context: &SnapshotContext,
    old_id: String,
    old_age: u32,
    recent_id: String,
    recent_age: u32,
    volume_id: String,
) {
    snapshot_context.runner.push_output(
        Some(0),
        json_snapshots(&[
            (
                old_id.as_str(),
                volume_id.as_str(),
                snapshot_context.days_ago(old_age),
            ),
            (
                recent_id.as_str(),
                volume_id.as_str(),
                snapshot_context.days_ago(recent_age),
            ),
        ]),
        "",
    );
}

#[given("aws accepts the deletion")]
fn aws_accepts_deletion(snapshot_context: &SnapshotContext) {
    snapshot_context.runner.push_success();
}

#[when("the backup run executes")]
fn run_executes(snapshot_context: &SnapshotContext) {
    snapshot_context.execute();
}

fn success_report(snapshot_context: &SnapshotContext) -> Result<String, StepError> {
    match snapshot_context.outcome() {
        Some(RunOutcome::Success { report, .. }) => Ok(report),
        other => Err(StepError::Assertion(format!(
            "expected a successful run, got: {other:?}"
        ))),
    }
}

#[then("the run reports {created:u32} created and {deleted:u32} deleted snapshot")]
fn reports_counts(
    snapshot_context: &SnapshotContext,
    created: u32,
    deleted: u32,
) -> Result<(), StepError> {
    let Some(RunOutcome::Success { summary, .. }) = snapshot_context.outcome() else {
        return Err(StepError::Assertion(String::from(
            "expected a successful run",
        )));
    };
    if summary.created_snapshots == created as usize && summary.deleted_snapshots == deleted as usize
    {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {created} created and {deleted} deleted, got {summary:?}"
        )))
    }
}

#[then("aws deleted snapshot \"{snapshot_id}\"")]
fn deleted_snapshot(snapshot_context: &SnapshotContext, snapshot_id: String) -> Result<(), StepError> {
    let deleted = snapshot_context
        .invocations_of("delete-snapshot")
        .iter()
        .filter_map(|call| call.arg_after("--snapshot-id"))
        .collect::<Vec<_>>();
    if deleted == vec![snapshot_id.clone()] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected only {snapshot_id} to be deleted, got {deleted:?}"
        )))
    }
}

#[then("aws named snapshot \"{snapshot_id}\" \"{name}\"")]
fn named_snapshot(
    snapshot_context: &SnapshotContext,
    snapshot_id: String,
    name: String,
) -> Result<(), StepError> {
    let tagging = snapshot_context.invocations_of("create-tags");
    let Some(call) = tagging.first() else {
        return Err(StepError::Assertion(String::from(
            "missing create-tags invocation",
        )));
    };
    let expected_tags = format!("[{{\"Key\":\"Name\",\"Value\":\"{name}\"}}]");
    if call.arg_after("--resources") == Some(snapshot_id.clone())
        && call.arg_after("--tags") == Some(expected_tags.clone())
    {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {snapshot_id} tagged {expected_tags}, got args: {:?}",
            call.args
        )))
    }
}

#[then("the report lists volume \"{volume_id}\" for snapshot creation")]
fn report_lists_volume(
    snapshot_context: &SnapshotContext,
    volume_id: String,
) -> Result<(), StepError> {
    let report = success_report(snapshot_context)?;
    let expected = format!("Volume Ids that snapshots will be created for:\n{volume_id}\n");
    if report.contains(&expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "report does not list {volume_id}: {report}"
        )))
    }
}

#[then("the report says snapshot \"{snapshot_id}\" will be removed")]
fn report_says_removed(
    snapshot_context: &SnapshotContext,
    snapshot_id: String,
) -> Result<(), StepError> {
    let report = success_report(snapshot_context)?;
    let expected = format!("Snapshot [{snapshot_id}] of volume [vol-1]: Will be removed.");
    if report.contains(&expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "report does not mark {snapshot_id} for removal: {report}"
        )))
    }
}

#[then("the report says volume \"{volume_id}\" was skipped")]
fn report_says_skipped(
    snapshot_context: &SnapshotContext,
    volume_id: String,
) -> Result<(), StepError> {
    let report = success_report(snapshot_context)?;
    let expected = format!("Volume [{volume_id}]: backup word 'daily' not found in tags");
    if report.contains(&expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "report does not mention skipped {volume_id}: {report}"
        )))
    }
}

#[then("aws received no mutating commands")]
fn no_mutating_commands(snapshot_context: &SnapshotContext) -> Result<(), StepError> {
    let mutating = snapshot_context.mutating_invocations();
    if mutating.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "dry run issued mutating commands: {mutating:?}"
        )))
    }
}

#[then("the run fails mentioning \"{volume_id}\" and \"{code}\"")]
fn run_fails(
    snapshot_context: &SnapshotContext,
    volume_id: String,
    code: String,
) -> Result<(), StepError> {
    let Some(RunOutcome::Failure(message)) = snapshot_context.outcome() else {
        return Err(StepError::Assertion(String::from(
            "expected the run to fail",
        )));
    };
    if message.contains(&volume_id) && message.contains(&code) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure naming {volume_id} and {code}, got: {message}"
        )))
    }
}
