//! Client-side SDK generation for the `codegen-ts` CLI.
//!
//! This library downloads a generated TypeScript client from the remote
//! generator, fixes up a few generated files, optionally compiles it, and
//! installs it into the caller's project. Watch mode repeats that whenever
//! the remote schema changes.
//!
//! ## Pipeline Stages
//!
//! - [`SchemaSource`] / [`RemoteClient`] - Fetch schema fingerprints and SDK archives
//! - [`materialize()`] - Extract the archive and remove duplicate imports
//! - [`BuildStage`] - Optional compile via [`ProcessRunner`]
//! - [`install()`] - Replace the destination directory wholesale
//! - [`Pipeline`] - Runs the stages above in a fresh working directory
//!
//! ## Watch Mode
//!
//! - [`Watcher`] - Interval polling with change detection
//! - [`WatchEvent`] - Events emitted while watching
//! - [`FingerprintStore`] / [`JsonFingerprintFile`] - Persisted baseline
//!
//! ## Configuration
//!
//! - [`CodegenConfig`] - Endpoints, output location and build commands

pub mod compile;
pub mod config;
mod error;
pub mod fingerprint;
pub mod install;
pub mod materialize;
mod pipeline;
pub mod process;
pub mod remote;
mod watcher;

pub use compile::BuildStage;
pub use config::{CodegenConfig, DEFAULT_POLL_INTERVAL};
pub use error::{
    BuildError, FingerprintError, InstallError, MaterializeError, PipelineError, RemoteError,
    WatchError,
};
pub use fingerprint::{Fingerprint, FingerprintStore, JsonFingerprintFile};
pub use install::install;
pub use materialize::{clean_duplicate_imports, materialize};
pub use pipeline::Pipeline;
pub use process::{ProcessOutput, ProcessRunner, SystemProcessRunner};
pub use remote::{RemoteClient, SchemaSource};
pub use watcher::{TickOutcome, WatchEvent, WatchState, WatchSummary, Watcher};
