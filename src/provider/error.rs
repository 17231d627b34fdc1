//! Error types for the AWS CLI provider.

use thiserror::Error;

use crate::command::CommandError;

/// Errors raised while talking to the provider.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// Raised when the CLI returns a non-zero exit status.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed (typically `aws`).
        program: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command, prefixed with the operation.
        stderr: String,
    },
    /// Raised when JSON output from the CLI cannot be parsed.
    #[error("failed to parse {resource} output: {message}")]
    Parse {
        /// Resource type being parsed (for example `volumes`).
        resource: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a request cannot be encoded as CLI arguments.
    #[error("failed to encode {resource} request: {message}")]
    Encode {
        /// Resource the request targets.
        resource: String,
        /// Serialiser error message.
        message: String,
    },
    /// Raised when command execution fails.
    #[error(transparent)]
    Runner(#[from] CommandError),
}
