//! Runtime configuration for generation and watch runs.

use std::path::PathBuf;
use std::time::Duration;

use crate::fingerprint::JsonFingerprintFile;

/// Content type listing used to detect schema changes.
pub const DEFAULT_SCHEMA_URL: &str = "https://api.flotiq.com/api/v1/internal/contenttype";

/// Endpoint that returns the generated SDK as a zip archive.
pub const DEFAULT_GENERATOR_URL: &str =
    "https://0c8judkapg.execute-api.us-east-1.amazonaws.com/default/codegen-ts";

/// Name of the output directory created in the caller's project.
pub const DEFAULT_OUTPUT_DIR: &str = "flotiqApi";

/// How often watch mode polls for schema changes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Environment variable overriding [`DEFAULT_SCHEMA_URL`].
pub const SCHEMA_URL_ENV: &str = "CODEGEN_SCHEMA_URL";

/// Environment variable overriding [`DEFAULT_GENERATOR_URL`].
pub const GENERATOR_URL_ENV: &str = "CODEGEN_GENERATOR_URL";

/// Environment variable overriding the fingerprint file location.
pub const FINGERPRINT_FILE_ENV: &str = "CODEGEN_FINGERPRINT_FILE";

/// Settings shared by one-shot generation and watch mode.
#[derive(Debug, Clone)]
pub struct CodegenConfig {
    pub schema_url: String,
    pub generator_url: String,
    /// Final location of the SDK. Replaced wholesale on every run.
    pub output_dir: PathBuf,
    pub fingerprint_file: PathBuf,
    /// Compile the TypeScript sources to JavaScript before installing.
    pub compile: bool,
    pub install_command: Vec<String>,
    pub build_command: Vec<String>,
}

impl CodegenConfig {
    /// Builds a configuration from defaults and `CODEGEN_*` overrides,
    /// placing the output directory under `cwd`.
    pub fn from_env(cwd: PathBuf) -> Self {
        let mut config = Self {
            output_dir: cwd.join(DEFAULT_OUTPUT_DIR),
            ..Self::default()
        };

        if let Some(url) = non_empty_env(SCHEMA_URL_ENV) {
            config.schema_url = url;
        }
        if let Some(url) = non_empty_env(GENERATOR_URL_ENV) {
            config.generator_url = url;
        }
        if let Some(path) = non_empty_env(FINGERPRINT_FILE_ENV) {
            config.fingerprint_file = PathBuf::from(path);
        }

        config
    }

    pub fn with_compile(mut self, compile: bool) -> Self {
        self.compile = compile;
        self
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            schema_url: DEFAULT_SCHEMA_URL.to_string(),
            generator_url: DEFAULT_GENERATOR_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            fingerprint_file: JsonFingerprintFile::default_path().path().clone(),
            compile: false,
            install_command: vec!["npm".to_string(), "install".to_string()],
            build_command: vec!["npm".to_string(), "run".to_string(), "build".to_string()],
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
