//! Test support utilities shared across unit and integration tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::command::{CommandError, CommandOutput, CommandRunner};
use crate::provider::{Snapshot, SnapshotProvider, Volume};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Returns the argument following `flag`, if any.
    #[must_use]
    pub fn arg_after(&self, flag: &str) -> Option<String> {
        self.args
            .iter()
            .skip_while(|arg| arg.to_string_lossy() != flag)
            .nth(1)
            .map(|arg| arg.to_string_lossy().into_owned())
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status with empty output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Provider operations, used to inject failures into [`RecordingProvider`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderOperation {
    /// `list_volumes`
    ListVolumes,
    /// `list_snapshots`
    ListSnapshots,
    /// `create_snapshot`
    CreateSnapshot,
    /// `apply_tags`
    ApplyTags,
    /// `delete_snapshot`
    DeleteSnapshot,
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ListVolumes => "list_volumes",
            Self::ListSnapshots => "list_snapshots",
            Self::CreateSnapshot => "create_snapshot",
            Self::ApplyTags => "apply_tags",
            Self::DeleteSnapshot => "delete_snapshot",
        };
        f.write_str(name)
    }
}

/// A call recorded by [`RecordingProvider`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProviderCall {
    /// Volumes were listed with the given tag-value filter.
    ListVolumes {
        /// Filter passed by the caller.
        filter: Option<String>,
    },
    /// Snapshots were listed for the given volumes.
    ListSnapshots {
        /// Volume ids passed by the caller.
        volume_ids: Vec<String>,
    },
    /// A snapshot was requested.
    CreateSnapshot {
        /// Source volume.
        volume_id: String,
        /// Description passed to the provider.
        description: String,
    },
    /// Tags were applied to a resource.
    ApplyTags {
        /// Tagged resource.
        resource_id: String,
        /// Tags applied.
        tags: BTreeMap<String, String>,
    },
    /// A snapshot was deleted.
    DeleteSnapshot {
        /// Deleted snapshot.
        snapshot_id: String,
    },
}

impl ProviderCall {
    /// Returns `true` for calls that change provider state.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::CreateSnapshot { .. } | Self::ApplyTags { .. } | Self::DeleteSnapshot { .. }
        )
    }
}

/// Failure injected into [`RecordingProvider`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("scripted {operation} failure for {resource}")]
pub struct ScriptedProviderError {
    /// Operation that failed.
    pub operation: ProviderOperation,
    /// Resource the operation targeted.
    pub resource: String,
}

/// In-memory provider that serves seeded volumes and snapshots and records
/// every call made against it.
#[derive(Clone, Debug, Default)]
pub struct RecordingProvider {
    volumes: Rc<RefCell<Vec<Volume>>>,
    snapshots: Rc<RefCell<Vec<Snapshot>>>,
    calls: Rc<RefCell<Vec<ProviderCall>>>,
    failures: Rc<RefCell<Vec<(ProviderOperation, String)>>>,
    next_snapshot: Rc<Cell<usize>>,
    unfiltered_snapshots: Rc<Cell<bool>>,
}

impl RecordingProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a volume returned by `list_volumes`.
    pub fn add_volume(&self, volume: Volume) {
        self.volumes.borrow_mut().push(volume);
    }

    /// Seeds a snapshot returned by `list_snapshots`.
    pub fn add_snapshot(&self, snapshot: Snapshot) {
        self.snapshots.borrow_mut().push(snapshot);
    }

    /// Makes `list_snapshots` return every seeded snapshot regardless of the
    /// requested volumes, imitating an over-broad provider query.
    pub fn disable_snapshot_filter(&self) {
        self.unfiltered_snapshots.set(true);
    }

    /// Makes `operation` fail when it targets `resource`.
    ///
    /// For listings the resource is ignored.
    pub fn fail_on(&self, operation: ProviderOperation, resource: impl Into<String>) {
        self.failures.borrow_mut().push((operation, resource.into()));
    }

    /// Returns a snapshot of all calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.borrow().clone()
    }

    /// Returns only the calls that change provider state.
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<ProviderCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.is_mutating())
            .cloned()
            .collect()
    }

    /// Identifiers of snapshots deleted so far, in call order.
    #[must_use]
    pub fn deleted_snapshot_ids(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ProviderCall::DeleteSnapshot { snapshot_id } => Some(snapshot_id.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ProviderCall) {
        self.calls.borrow_mut().push(call);
    }

    fn check_failure(
        &self,
        operation: ProviderOperation,
        resource: &str,
    ) -> Result<(), ScriptedProviderError> {
        let listing = matches!(
            operation,
            ProviderOperation::ListVolumes | ProviderOperation::ListSnapshots
        );
        let fails = self
            .failures
            .borrow()
            .iter()
            .any(|(op, target)| *op == operation && (listing || target == resource));
        if fails {
            return Err(ScriptedProviderError {
                operation,
                resource: resource.to_owned(),
            });
        }
        Ok(())
    }
}

impl SnapshotProvider for RecordingProvider {
    type Error = ScriptedProviderError;

    fn list_volumes(&self, tag_value_filter: Option<&str>) -> Result<Vec<Volume>, Self::Error> {
        self.record(ProviderCall::ListVolumes {
            filter: tag_value_filter.map(str::to_owned),
        });
        self.check_failure(ProviderOperation::ListVolumes, "volumes")?;
        Ok(self.volumes.borrow().clone())
    }

    fn list_snapshots(&self, volume_ids: &[String]) -> Result<Vec<Snapshot>, Self::Error> {
        self.record(ProviderCall::ListSnapshots {
            volume_ids: volume_ids.to_vec(),
        });
        self.check_failure(ProviderOperation::ListSnapshots, "snapshots")?;
        let unfiltered = self.unfiltered_snapshots.get();
        Ok(self
            .snapshots
            .borrow()
            .iter()
            .filter(|snapshot| unfiltered || volume_ids.contains(&snapshot.volume_id))
            .cloned()
            .collect())
    }

    fn create_snapshot(
        &self,
        volume_id: &str,
        description: &str,
    ) -> Result<Snapshot, Self::Error> {
        self.record(ProviderCall::CreateSnapshot {
            volume_id: volume_id.to_owned(),
            description: description.to_owned(),
        });
        self.check_failure(ProviderOperation::CreateSnapshot, volume_id)?;
        let sequence = self.next_snapshot.get() + 1;
        self.next_snapshot.set(sequence);
        Ok(Snapshot::new(
            format!("snap-new-{sequence}"),
            volume_id,
            Utc::now(),
        ))
    }

    fn apply_tags(
        &self,
        resource_id: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), Self::Error> {
        self.record(ProviderCall::ApplyTags {
            resource_id: resource_id.to_owned(),
            tags: tags.clone(),
        });
        self.check_failure(ProviderOperation::ApplyTags, resource_id)
    }

    fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), Self::Error> {
        self.record(ProviderCall::DeleteSnapshot {
            snapshot_id: snapshot_id.to_owned(),
        });
        self.check_failure(ProviderOperation::DeleteSnapshot, snapshot_id)
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    #[must_use]
    pub fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

fn json_tags(tags: &[(&str, &str)]) -> String {
    tags.iter()
        .map(|(key, value)| format!("{{\"Key\":\"{key}\",\"Value\":\"{value}\"}}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Produces a minimal JSON payload matching `aws ec2 describe-volumes`.
#[must_use]
pub fn json_volumes(volumes: &[(&str, &[(&str, &str)])]) -> String {
    let items = volumes
        .iter()
        .map(|(id, tags)| {
            format!(
                "{{\"VolumeId\":\"{id}\",\"State\":\"in-use\",\"Tags\":[{}]}}",
                json_tags(tags)
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("{{\"Volumes\":[{items}]}}")
}

/// Produces a single snapshot object as printed by `aws ec2 create-snapshot`.
#[must_use]
pub fn json_snapshot(snapshot_id: &str, volume_id: &str, started: DateTime<Utc>) -> String {
    format!(
        "{{\"SnapshotId\":\"{snapshot_id}\",\"VolumeId\":\"{volume_id}\",\"StartTime\":\"{}\",\"State\":\"pending\"}}",
        started.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Produces a minimal JSON payload matching `aws ec2 describe-snapshots`.
#[must_use]
pub fn json_snapshots(snapshots: &[(&str, &str, DateTime<Utc>)]) -> String {
    let items = snapshots
        .iter()
        .map(|(snapshot_id, volume_id, started)| json_snapshot(snapshot_id, volume_id, *started))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{\"Snapshots\":[{items}]}}")
}
