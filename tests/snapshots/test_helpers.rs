//! Shared fixtures and helpers for snapshot BDD scenarios.

use std::cell::RefCell;

use chrono::{DateTime, Duration, TimeZone, Utc};
use ec2backup::test_support::{CommandInvocation, ScriptedRunner};
use ec2backup::{AwsCliProvider, AwsCliSettings, BackupConfig, BackupRun, RunSummary};
use rstest::fixture;

/// Operations that change provider state.
const MUTATING_OPERATIONS: [&str; 3] = ["create-snapshot", "create-tags", "delete-snapshot"];

#[derive(Clone, Debug)]
pub enum RunOutcome {
    Success { summary: RunSummary, report: String },
    Failure(String),
}

#[derive(Debug)]
pub struct SnapshotContext {
    pub runner: ScriptedRunner,
    pub now: DateTime<Utc>,
    pub config: RefCell<Option<BackupConfig>>,
    pub outcome: RefCell<Option<RunOutcome>>,
}

#[fixture]
pub fn snapshot_context() -> SnapshotContext {
    SnapshotContext {
        runner: ScriptedRunner::new(),
        now: Utc
            .with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("fixed instant should be valid")),
        config: RefCell::new(None),
        outcome: RefCell::new(None),
    }
}

impl SnapshotContext {
    pub fn configure(&self, word: &str, days: u32, check: bool) {
        self.config.replace(Some(BackupConfig {
            profile: String::from("default"),
            region: String::from("us-east-1"),
            word: word.to_owned(),
            days: Some(days),
            check,
            aws_bin: String::from("aws"),
        }));
    }

    pub fn days_ago(&self, days: u32) -> DateTime<Utc> {
        self.now - Duration::days(i64::from(days))
    }

    pub fn execute(&self) {
        let config = self
            .config
            .borrow()
            .clone()
            .unwrap_or_else(|| panic!("test setup requires a configured run"));
        let provider =
            AwsCliProvider::new(AwsCliSettings::from_config(&config), self.runner.clone());
        let mut out = Vec::new();
        let result = BackupRun::new(&config, provider)
            .with_now(self.now)
            .execute(&mut out);
        let outcome = match result {
            Ok(summary) => RunOutcome::Success {
                summary,
                report: String::from_utf8_lossy(&out).into_owned(),
            },
            Err(err) => RunOutcome::Failure(err.to_string()),
        };
        self.outcome.replace(Some(outcome));
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome.borrow().clone()
    }

    pub fn invocations_of(&self, operation: &str) -> Vec<CommandInvocation> {
        self.runner
            .invocations()
            .into_iter()
            .filter(|call| operation_of(call) == Some(operation.to_owned()))
            .collect()
    }

    pub fn mutating_invocations(&self) -> Vec<CommandInvocation> {
        self.runner
            .invocations()
            .into_iter()
            .filter(|call| {
                operation_of(call)
                    .is_some_and(|operation| MUTATING_OPERATIONS.contains(&operation.as_str()))
            })
            .collect()
    }
}

/// Returns the `aws ec2` subcommand of an invocation.
pub fn operation_of(call: &CommandInvocation) -> Option<String> {
    call.arg_after("ec2")
}
