//! Error types for the codegen library.
//!
//! Each pipeline stage owns its error enum so callers can tell a network
//! failure apart from a broken archive or a failed compile. [`PipelineError`]
//! wraps all of them for a full generation run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to the schema or generator service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with an error.
    ///
    /// `message` is the server's explanation when one was provided.
    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response from {url}: {reason}")]
    UnexpectedBody { url: String, reason: String },

    /// A content type lookup returned no rows.
    #[error("no content types returned when ordering by {order_by}")]
    EmptyResult { order_by: &'static str },
}

/// Errors raised while extracting the archive or post-processing files.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The archive is corrupt or uses an unsupported feature.
    #[error("invalid archive: {0}")]
    Archive(String),

    /// An entry tried to escape the extraction root.
    #[error("unsafe path in archive: {0}")]
    UnsafePath(String),

    /// Writing into the working directory failed.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An import-fix glob pattern was rejected.
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Errors raised by the optional compile step.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The external program could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program exited unsuccessfully.
    ///
    /// `output` holds the combined stdout and stderr of the process.
    #[error("`{command}` exited with {}:\n{output}", exit_description(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// The compile finished but an expected artifact is missing.
    #[error("build artifact not found: {0}")]
    MissingArtifact(PathBuf),

    /// Moving files between the bundle and its build copy failed.
    #[error("failed to relocate {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A command was configured without a program.
    #[error("empty build command")]
    EmptyCommand,
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "a signal".to_string(),
    }
}

/// Errors raised while moving the bundle into its destination.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The previous output could not be removed.
    #[error("failed to remove existing output {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bundle could not be moved into place.
    #[error("failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying across filesystems failed.
    #[error("failed to copy {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur when working with the fingerprint file.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Failed to read or write the fingerprint file.
    #[error("failed to access fingerprint file: {0}")]
    Io(#[from] std::io::Error),

    /// The fingerprint file does not contain a valid fingerprint.
    #[error("failed to parse fingerprint file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from a full generation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Install(#[from] InstallError),

    /// The blocking stage panicked or was cancelled.
    #[error("generation task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors that end a watch tick before any regeneration starts.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to check for schema changes: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}
