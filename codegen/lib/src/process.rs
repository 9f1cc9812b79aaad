//! Synchronous external process execution.

use std::path::Path;
use std::process::{Command, Stdio};

/// Exit status and captured output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Stdout followed by stderr.
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external programs to completion.
///
/// The build stage depends only on this trait, so tests can substitute a
/// recording runner for the real toolchain.
pub trait ProcessRunner: Send + Sync {
    /// Runs `program` with `args` in `cwd` and waits for it to exit.
    ///
    /// ## Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> std::io::Result<ProcessOutput>;
}

/// [`ProcessRunner`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> std::io::Result<ProcessOutput> {
        tracing::debug!(program, ?args, cwd = %cwd.display(), "Running external command");

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ProcessOutput {
            code: output.status.code(),
            output: combined,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let dir = TempDir::new().unwrap();
        let out = SystemProcessRunner
            .run("/bin/sh", &sh("echo out; echo err >&2"), dir.path())
            .unwrap();

        assert!(out.success());
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
    }

    #[test]
    fn reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let out = SystemProcessRunner
            .run("/bin/sh", &sh("exit 3"), dir.path())
            .unwrap();

        assert!(!out.success());
        assert_eq!(out.code, Some(3));
    }

    #[test]
    fn runs_in_given_directory() {
        let dir = TempDir::new().unwrap();
        SystemProcessRunner
            .run("/bin/sh", &sh("touch marker"), dir.path())
            .unwrap();

        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn missing_program_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = SystemProcessRunner.run("definitely-not-a-real-program", &[], dir.path());
        assert!(result.is_err());
    }
}
