use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{backend} returned malformed output: {source}")]
    MalformedOutput {
        backend: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{backend} returned an unexpected payload: {reason}")]
    UnexpectedPayload { backend: String, reason: String },

    #[error("docker api error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("{backend} did not answer within {}s", after.as_secs())]
    Timeout { backend: String, after: Duration },

    #[error("{backend} cannot remove {resource}: {reason}")]
    Unsupported {
        backend: String,
        resource: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("query has unbalanced quotes: {0}")]
    UnbalancedQuotes(String),

    #[error("query token '{0}' is not of the form key=value")]
    MalformedToken(String),

    #[error("query token '{0}' has an empty key")]
    EmptyKey(String),

    #[error("query token '{0}' has no values")]
    EmptyValues(String),

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("index {index} is out of range for a listing of {len} items")]
    OutOfRange { index: usize, len: usize },

    #[error("range {start}..{end} is reversed")]
    ReversedRange { start: usize, end: usize },
}
