//! Tests for configuration loading, overrides, and validation.

use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use ec2backup::config::{DEFAULT_BACKUP_WORD, DEFAULT_PROFILE, DEFAULT_REGION};
use ec2backup::test_support::EnvGuard;
use ec2backup::{BackupConfig, ConfigError, ConfigOverrides};
use rstest::{fixture, rstest};
use tempfile::TempDir;

/// Writes `contents` to `ec2backup.toml` inside `tmp` and returns its path.
fn write_config_file(tmp: &TempDir, contents: &str) -> String {
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
    Dir::open_ambient_dir(&root, ambient_authority())
        .unwrap_or_else(|err| panic!("open temp dir: {err}"))
        .write("ec2backup.toml", contents)
        .unwrap_or_else(|err| panic!("write config file: {err}"));
    root.join("ec2backup.toml").into_string()
}

#[fixture]
fn valid_config() -> BackupConfig {
    BackupConfig {
        profile: String::from(DEFAULT_PROFILE),
        region: String::from(DEFAULT_REGION),
        word: String::from(DEFAULT_BACKUP_WORD),
        days: None,
        check: false,
        aws_bin: String::from("aws"),
    }
}

#[rstest]
fn valid_config_passes_validation(valid_config: BackupConfig) {
    assert_eq!(valid_config.validate(), Ok(()));
}

/// Validation errors name both the environment variable and the
/// configuration file key for each required field.
#[rstest]
#[case::profile("EC2BACKUP_PROFILE", "profile")]
#[case::region("EC2BACKUP_REGION", "region")]
#[case::word("EC2BACKUP_WORD", "word")]
#[case::aws_bin("EC2BACKUP_AWS_BIN", "aws_bin")]
fn blank_fields_produce_actionable_errors(
    valid_config: BackupConfig,
    #[case] env_var: &str,
    #[case] key: &str,
) {
    let blank = String::from("  ");
    let cfg = match key {
        "profile" => BackupConfig {
            profile: blank,
            ..valid_config
        },
        "region" => BackupConfig {
            region: blank,
            ..valid_config
        },
        "word" => BackupConfig {
            word: blank,
            ..valid_config
        },
        _ => BackupConfig {
            aws_bin: blank,
            ..valid_config
        },
    };

    let err = cfg.validate().expect_err("blank field should be rejected");
    let ConfigError::MissingField(ref message) = err else {
        panic!("expected MissingField error, got {err:?}");
    };
    assert!(message.contains(env_var), "error should mention {env_var}: {message}");
    assert!(
        message.contains("ec2backup.toml"),
        "error should mention the config file: {message}"
    );
    assert!(
        message.contains(&format!("add {key} ")),
        "error should mention the TOML key {key}: {message}"
    );
}

#[rstest]
fn overrides_win_over_loaded_values(valid_config: BackupConfig) {
    let merged = BackupConfig {
        days: Some(30),
        ..valid_config
    }
    .with_overrides(ConfigOverrides {
        region: Some(String::from("ap-southeast-2")),
        days: Some(7),
        check: true,
        ..ConfigOverrides::default()
    });

    assert_eq!(merged.region, "ap-southeast-2");
    assert_eq!(merged.days, Some(7));
    assert!(merged.check);
    assert_eq!(merged.profile, DEFAULT_PROFILE);
    assert_eq!(merged.word, DEFAULT_BACKUP_WORD);
}

#[rstest]
fn empty_overrides_keep_loaded_values(valid_config: BackupConfig) {
    let loaded = BackupConfig {
        days: Some(30),
        check: true,
        ..valid_config
    };
    assert_eq!(
        loaded.clone().with_overrides(ConfigOverrides::default()),
        loaded
    );
}

#[rstest]
fn environment_variables_feed_the_loader() {
    let _guard = EnvGuard::set_vars(&[
        ("EC2BACKUP_WORD", "weekly"),
        ("EC2BACKUP_REGION", "eu-central-1"),
        ("EC2BACKUP_DAYS", "14"),
    ]);

    let cfg = BackupConfig::load_without_cli_args().expect("config should load");

    assert_eq!(cfg.word, "weekly");
    assert_eq!(cfg.region, "eu-central-1");
    assert_eq!(cfg.days, Some(14));
}

#[rstest]
fn config_file_feeds_the_loader() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = write_config_file(
        &tmp,
        "word = \"monthly\"\nregion = \"sa-east-1\"\ndays = 21\ncheck = true\n",
    );
    let _guard = EnvGuard::set_vars(&[("EC2BACKUP_CONFIG_PATH", path.as_str())]);

    let cfg = BackupConfig::load_without_cli_args().expect("config should load");

    assert_eq!(cfg.word, "monthly");
    assert_eq!(cfg.region, "sa-east-1");
    assert_eq!(cfg.days, Some(21));
    assert!(cfg.check);
    assert_eq!(cfg.profile, DEFAULT_PROFILE);
}

#[rstest]
fn environment_wins_over_config_file() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = write_config_file(&tmp, "word = \"monthly\"\n");
    let _guard = EnvGuard::set_vars(&[
        ("EC2BACKUP_CONFIG_PATH", path.as_str()),
        ("EC2BACKUP_WORD", "hourly"),
    ]);

    let cfg = BackupConfig::load_without_cli_args().expect("config should load");

    assert_eq!(cfg.word, "hourly");
}
