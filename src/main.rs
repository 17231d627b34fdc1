//! Binary entry point for the `ec2backup` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use ec2backup::{
    AwsCliProvider, AwsCliSettings, BackupConfig, BackupError, BackupRun, ConfigError,
    ConfigOverrides, ProviderError,
};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("backup run failed: {0}")]
    Run(#[from] BackupError<ProviderError>),
    #[error("failed to write summary: {0}")]
    Output(#[from] io::Error),
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = BackupConfig::load_without_cli_args()?.with_overrides(overrides_from(cli));
    config.validate()?;

    let provider = AwsCliProvider::with_process_runner(AwsCliSettings::from_config(&config));
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = BackupRun::new(&config, provider).execute(&mut out)?;
    tracing::info!(%summary, "run finished");
    writeln!(out, "{summary}")?;
    Ok(())
}

fn overrides_from(cli: Cli) -> ConfigOverrides {
    ConfigOverrides {
        profile: cli.profile,
        region: cli.region,
        word: cli.word,
        days: cli.days,
        check: cli.check,
        aws_bin: cli.aws_bin,
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
