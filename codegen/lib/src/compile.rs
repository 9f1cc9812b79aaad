//! Optional compile step turning the TypeScript bundle into JavaScript.
//!
//! The bundle is moved to a sibling `<name>_copy` directory, its
//! dependencies are installed and its build script is run there. Only the
//! build output, `package.json` and `README.md` are moved back, so the
//! installed SDK contains compiled code without the TypeScript sources.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CodegenConfig;
use crate::error::BuildError;
use crate::process::{ProcessRunner, SystemProcessRunner};

/// Entries moved back from the build copy after a successful compile.
pub const BUILD_ARTIFACTS: [&str; 3] = ["dist", "package.json", "README.md"];

/// Compiles a bundle with external commands.
#[derive(Clone)]
pub struct BuildStage {
    runner: Arc<dyn ProcessRunner>,
    install_command: Vec<String>,
    build_command: Vec<String>,
}

impl std::fmt::Debug for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildStage")
            .field("install_command", &self.install_command)
            .field("build_command", &self.build_command)
            .finish_non_exhaustive()
    }
}

impl BuildStage {
    /// Creates a build stage running `npm install` and `npm run build`.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        let defaults = CodegenConfig::default();
        Self {
            runner,
            install_command: defaults.install_command,
            build_command: defaults.build_command,
        }
    }

    /// Creates a build stage using the commands from `config` and the
    /// system process runner.
    pub fn from_config(config: &CodegenConfig) -> Self {
        Self::new(Arc::new(SystemProcessRunner)).with_commands(
            config.install_command.clone(),
            config.build_command.clone(),
        )
    }

    pub fn with_commands(mut self, install: Vec<String>, build: Vec<String>) -> Self {
        self.install_command = install;
        self.build_command = build;
        self
    }

    /// Compiles the bundle at `bundle_path` in place.
    ///
    /// On success `bundle_path` holds only [`BUILD_ARTIFACTS`] and the build
    /// copy is gone.
    ///
    /// ## Errors
    ///
    /// Returns [`BuildError`] if a command fails or an artifact is missing.
    /// The build copy is left behind in that case.
    pub fn build(&self, bundle_path: &Path) -> Result<(), BuildError> {
        let copy_path = build_copy_path(bundle_path);
        tracing::debug!(copy = %copy_path.display(), "Moving sources to build copy");

        if copy_path.exists() {
            fs::remove_dir_all(&copy_path).map_err(io_err(&copy_path))?;
        }
        fs::rename(bundle_path, &copy_path).map_err(io_err(bundle_path))?;

        self.run_step(&self.install_command, &copy_path)?;
        self.run_step(&self.build_command, &copy_path)?;

        fs::create_dir_all(bundle_path).map_err(io_err(bundle_path))?;
        for artifact in BUILD_ARTIFACTS {
            let from = copy_path.join(artifact);
            if !from.exists() {
                return Err(BuildError::MissingArtifact(from));
            }
            let to = bundle_path.join(artifact);
            remove_entry(&to)?;
            fs::rename(&from, &to).map_err(io_err(&from))?;
        }

        fs::remove_dir_all(&copy_path).map_err(io_err(&copy_path))?;
        Ok(())
    }

    fn run_step(&self, command: &[String], cwd: &Path) -> Result<(), BuildError> {
        let (program, args) = command.split_first().ok_or(BuildError::EmptyCommand)?;
        let command_line = command.join(" ");
        tracing::info!(command = %command_line, "Running build step");

        let result = self
            .runner
            .run(program, args, cwd)
            .map_err(|source| BuildError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        if !result.success() {
            return Err(BuildError::CommandFailed {
                command: command_line,
                code: result.code,
                output: result.output,
            });
        }
        Ok(())
    }
}

/// `<parent>/<name>_copy` for a bundle at `<parent>/<name>`.
pub fn build_copy_path(bundle_path: &Path) -> PathBuf {
    let mut name = bundle_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("bundle"));
    name.push("_copy");
    bundle_path.with_file_name(name)
}

fn remove_entry(path: &Path) -> Result<(), BuildError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };
    result.map_err(io_err(path))
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError {
    let path = path.to_path_buf();
    move |source| BuildError::Io { path, source }
}
