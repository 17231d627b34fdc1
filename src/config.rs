//! Configuration loading via `ortho-config`.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::provider::DEFAULT_AWS_BIN;

/// Default substring that marks a volume for backup.
pub const DEFAULT_BACKUP_WORD: &str = "daily";

/// Default credential profile.
pub const DEFAULT_PROFILE: &str = "default";

/// Default region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Settings for a single backup run, merged from defaults, configuration
/// files, environment variables, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "EC2BACKUP",
    discovery(
        app_name = "ec2backup",
        env_var = "EC2BACKUP_CONFIG_PATH",
        config_file_name = "ec2backup.toml",
        dotfile_name = ".ec2backup.toml",
        project_file_name = "ec2backup.toml"
    )
)]
pub struct BackupConfig {
    /// Credential profile handed to the provider.
    #[ortho_config(default = DEFAULT_PROFILE.to_owned())]
    pub profile: String,
    /// Region the run operates in.
    #[ortho_config(default = DEFAULT_REGION.to_owned())]
    pub region: String,
    /// Substring searched for, case-insensitively, in volume tag values.
    #[ortho_config(default = DEFAULT_BACKUP_WORD.to_owned())]
    pub word: String,
    /// Retention window in days. When absent no snapshot is pruned.
    pub days: Option<u32>,
    /// Dry-run mode: report decisions without mutating provider state.
    #[ortho_config(default = false)]
    pub check: bool,
    /// Path to the `aws` executable.
    #[ortho_config(default = DEFAULT_AWS_BIN.to_owned())]
    pub aws_bin: String,
}

/// Values supplied explicitly on the command line. They win over every other
/// configuration source.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigOverrides {
    /// `--profile`
    pub profile: Option<String>,
    /// `--region`
    pub region: Option<String>,
    /// `--word`
    pub word: Option<String>,
    /// `--days`
    pub days: Option<u32>,
    /// `--check`; only ever switches dry-run mode on.
    pub check: bool,
    /// `--aws-bin`
    pub aws_bin: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl BackupConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to ec2backup.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("ec2backup")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies explicit command-line values on top of the loaded ones.
    #[must_use]
    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        Self {
            profile: overrides.profile.unwrap_or(self.profile),
            region: overrides.region.unwrap_or(self.region),
            word: overrides.word.unwrap_or(self.word),
            days: overrides.days.or(self.days),
            check: overrides.check || self.check,
            aws_bin: overrides.aws_bin.unwrap_or(self.aws_bin),
        }
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.profile,
            &FieldMetadata::new("credential profile", "EC2BACKUP_PROFILE", "profile"),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("region", "EC2BACKUP_REGION", "region"),
        )?;
        Self::require_field(
            &self.word,
            &FieldMetadata::new("backup word", "EC2BACKUP_WORD", "word"),
        )?;
        Self::require_field(
            &self.aws_bin,
            &FieldMetadata::new("aws CLI binary", "EC2BACKUP_AWS_BIN", "aws_bin"),
        )?;
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

