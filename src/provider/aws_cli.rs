//! [`SnapshotProvider`] implementation that shells out to the AWS CLI.
//!
//! Each operation maps onto a single `aws ec2 ...` invocation with JSON
//! output. Profile and region selection, credential lookup, and pagination
//! are left to the CLI itself.

use std::collections::BTreeMap;
use std::ffi::OsString;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ProviderError, Snapshot, SnapshotProvider, Tag, Volume};
use crate::command::{CommandOutput, CommandRunner, ProcessCommandRunner};
use crate::config::BackupConfig;

/// Default AWS CLI binary name.
pub const DEFAULT_AWS_BIN: &str = "aws";

/// Connection settings passed to every CLI invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AwsCliSettings {
    /// Path to the `aws` executable.
    pub aws_bin: String,
    /// Named credential profile.
    pub profile: String,
    /// Target region.
    pub region: String,
}

impl AwsCliSettings {
    /// Creates settings, trimming whitespace.
    #[must_use]
    pub fn new(
        aws_bin: impl Into<String>,
        profile: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            aws_bin: aws_bin.into().trim().to_owned(),
            profile: profile.into().trim().to_owned(),
            region: region.into().trim().to_owned(),
        }
    }

    /// Extracts the CLI settings from a validated run configuration.
    #[must_use]
    pub fn from_config(config: &BackupConfig) -> Self {
        Self::new(&config.aws_bin, &config.profile, &config.region)
    }
}

#[derive(Serialize)]
struct Filter<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Values")]
    values: Vec<String>,
}

/// Talks to EC2 through the `aws` command-line client.
#[derive(Clone, Debug)]
pub struct AwsCliProvider<R: CommandRunner> {
    settings: AwsCliSettings,
    runner: R,
}

impl AwsCliProvider<ProcessCommandRunner> {
    /// Creates a provider wired to the real process runner.
    #[must_use]
    pub const fn with_process_runner(settings: AwsCliSettings) -> Self {
        Self::new(settings, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> AwsCliProvider<R> {
    /// Creates a provider using the given settings and runner.
    #[must_use]
    pub const fn new(settings: AwsCliSettings, runner: R) -> Self {
        Self { settings, runner }
    }

    /// Returns the settings used for every invocation.
    #[must_use]
    pub const fn settings(&self) -> &AwsCliSettings {
        &self.settings
    }

    /// Builds `ec2 <operation> <operation args> --profile .. --region .. --output json`.
    fn build_args(&self, operation: &str, operation_args: Vec<OsString>) -> Vec<OsString> {
        let mut args = vec![OsString::from("ec2"), OsString::from(operation)];
        args.extend(operation_args);
        args.push(OsString::from("--profile"));
        args.push(OsString::from(&self.settings.profile));
        args.push(OsString::from("--region"));
        args.push(OsString::from(&self.settings.region));
        args.push(OsString::from("--output"));
        args.push(OsString::from("json"));
        args
    }

    fn run_aws(&self, args: &[OsString], resource: &str) -> Result<CommandOutput, ProviderError> {
        debug!(
            program = %self.settings.aws_bin,
            resource,
            "invoking aws cli"
        );
        let output = self.runner.run(&self.settings.aws_bin, args)?;
        self.check_aws_output(output, resource)
    }

    /// Checks command output and converts failure to `ProviderError`.
    fn check_aws_output(
        &self,
        output: CommandOutput,
        resource: &str,
    ) -> Result<CommandOutput, ProviderError> {
        if output.is_success() {
            return Ok(output);
        }

        Err(ProviderError::CommandFailure {
            program: self.settings.aws_bin.clone(),
            status: output.code,
            status_text: output.status_text(),
            stderr: format!("{resource}: {}", output.stderr.trim()),
        })
    }
}

fn encode_json<T: Serialize>(value: &T, resource: &str) -> Result<OsString, ProviderError> {
    serde_json::to_string(value)
        .map(OsString::from)
        .map_err(|err| ProviderError::Encode {
            resource: resource.to_owned(),
            message: err.to_string(),
        })
}

/// Parses `{"<field>": [...]}` listing output.
fn parse_listing<T>(stdout: &str, field: &str, resource: &str) -> Result<Vec<T>, ProviderError>
where
    T: DeserializeOwned,
{
    let parse_error = |message: String| ProviderError::Parse {
        resource: resource.to_owned(),
        message,
    };
    let value: serde_json::Value =
        serde_json::from_str(stdout).map_err(|err| parse_error(err.to_string()))?;
    let serde_json::Value::Object(mut object) = value else {
        return Err(parse_error(String::from("unexpected JSON shape")));
    };
    let items = object
        .remove(field)
        .ok_or_else(|| parse_error(format!("missing '{field}' field")))?;
    serde_json::from_value(items).map_err(|err| parse_error(err.to_string()))
}

impl<R: CommandRunner> SnapshotProvider for AwsCliProvider<R> {
    type Error = ProviderError;

    fn list_volumes(&self, tag_value_filter: Option<&str>) -> Result<Vec<Volume>, Self::Error> {
        let mut operation_args = Vec::new();
        if let Some(word) = tag_value_filter {
            let filters = [Filter {
                name: "tag-value",
                values: vec![format!("*{word}*")],
            }];
            operation_args.push(OsString::from("--filters"));
            operation_args.push(encode_json(&filters, "volumes")?);
        }
        let args = self.build_args("describe-volumes", operation_args);
        let output = self.run_aws(&args, "volumes")?;
        parse_listing(&output.stdout, "Volumes", "volumes")
    }

    fn list_snapshots(&self, volume_ids: &[String]) -> Result<Vec<Snapshot>, Self::Error> {
        if volume_ids.is_empty() {
            return Ok(Vec::new());
        }
        let filters = [Filter {
            name: "volume-id",
            values: volume_ids.to_vec(),
        }];
        let operation_args = vec![
            OsString::from("--owner-ids"),
            OsString::from("self"),
            OsString::from("--filters"),
            encode_json(&filters, "snapshots")?,
        ];
        let args = self.build_args("describe-snapshots", operation_args);
        let output = self.run_aws(&args, "snapshots")?;
        parse_listing(&output.stdout, "Snapshots", "snapshots")
    }

    fn create_snapshot(
        &self,
        volume_id: &str,
        description: &str,
    ) -> Result<Snapshot, Self::Error> {
        let operation_args = vec![
            OsString::from("--volume-id"),
            OsString::from(volume_id),
            OsString::from("--description"),
            OsString::from(description),
        ];
        let args = self.build_args("create-snapshot", operation_args);
        let output = self.run_aws(&args, "snapshot create")?;
        serde_json::from_str(&output.stdout).map_err(|err| ProviderError::Parse {
            resource: String::from("snapshot create"),
            message: err.to_string(),
        })
    }

    fn apply_tags(
        &self,
        resource_id: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), Self::Error> {
        let tag_list = tags
            .iter()
            .map(|(key, value)| Tag::new(key, value))
            .collect::<Vec<_>>();
        let operation_args = vec![
            OsString::from("--resources"),
            OsString::from(resource_id),
            OsString::from("--tags"),
            encode_json(&tag_list, "tags")?,
        ];
        let args = self.build_args("create-tags", operation_args);
        self.run_aws(&args, "create tags").map(|_| ())
    }

    fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), Self::Error> {
        let operation_args = vec![
            OsString::from("--snapshot-id"),
            OsString::from(snapshot_id),
        ];
        let args = self.build_args("delete-snapshot", operation_args);
        self.run_aws(&args, "snapshot delete").map(|_| ())
    }
}
