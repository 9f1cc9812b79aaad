//! One full generation run: fetch, materialize, compile, install.
//!
//! Every run gets a fresh, uniquely named working directory under the OS
//! temp root. The bundle is assembled there and only reaches the
//! destination through [`install`](crate::install::install), after every
//! other stage has succeeded.

use std::path::{Path, PathBuf};

use crate::compile::BuildStage;
use crate::config::{CodegenConfig, DEFAULT_OUTPUT_DIR};
use crate::error::{MaterializeError, PipelineError};
use crate::install::install;
use crate::materialize::materialize;
use crate::remote::SchemaSource;

/// Prefix of the per-run working directory.
const WORKING_DIR_PREFIX: &str = "codegen-ts-";

/// Regenerates the SDK at a fixed destination.
#[derive(Debug)]
pub struct Pipeline<S> {
    source: S,
    destination: PathBuf,
    build: Option<BuildStage>,
}

impl<S: SchemaSource> Pipeline<S> {
    /// Creates a pipeline writing to `destination` without compiling.
    pub fn new(source: S, destination: PathBuf) -> Self {
        Self {
            source,
            destination,
            build: None,
        }
    }

    /// Creates a pipeline from `config`, compiling when `config.compile`
    /// is set.
    pub fn from_config(source: S, config: &CodegenConfig) -> Self {
        let pipeline = Self::new(source, config.output_dir.clone());
        if config.compile {
            pipeline.with_build(BuildStage::from_config(config))
        } else {
            pipeline
        }
    }

    pub fn with_build(mut self, build: BuildStage) -> Self {
        self.build = Some(build);
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs the pipeline once.
    ///
    /// ## Errors
    ///
    /// Returns the error of the first failing stage. The destination is
    /// untouched unless the failure happened during installation.
    pub async fn run(&self) -> Result<(), PipelineError> {
        tracing::info!("Generating client from schema");
        let archive = self.source.fetch_bundle().await?;

        let working = tempfile::Builder::new()
            .prefix(WORKING_DIR_PREFIX)
            .tempdir()
            .map_err(|source| MaterializeError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        let bundle_path = working.path().join(bundle_dir_name(&self.destination));
        let destination = self.destination.clone();
        let build = self.build.clone();

        tracing::info!(path = %working.path().display(), "Extracting SDK client to working directory");

        tokio::task::spawn_blocking(move || -> Result<(), PipelineError> {
            materialize(&archive, &bundle_path)?;

            if let Some(build) = build {
                tracing::info!("Compiling to JavaScript");
                build.build(&bundle_path)?;
            }

            install(&bundle_path, &destination)?;

            // Removes whatever is left of the working directory.
            drop(working);
            Ok(())
        })
        .await??;

        tracing::info!(path = %self.destination.display(), "Installed SDK");
        Ok(())
    }
}

fn bundle_dir_name(destination: &Path) -> PathBuf {
    destination
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}
