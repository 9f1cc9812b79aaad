//! API key resolution.
//!
//! The key is taken from the first source that has one:
//!
//! 1. `--flotiq-api-key`
//! 2. the `FLOTIQ_API_KEY` environment variable
//! 3. `.env` files in the current directory, after confirmation
//! 4. an interactive prompt
//!
//! Silent runs never prompt, so steps 3 and 4 are skipped.

use std::path::{Path, PathBuf};

use inquire::validator::Validation;

use crate::CliError;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "FLOTIQ_API_KEY";

/// Resolves the API key for this run.
pub fn resolve(flag: Option<&str>, cwd: &Path, silent: bool) -> Result<String, CliError> {
    if let Some(key) = flag.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
        return Ok(key);
    }

    if silent {
        return Err(CliError::MissingApiKey);
    }

    let node_env = std::env::var("NODE_ENV").ok();
    let files = env_file_candidates(cwd, node_env.as_deref());
    if let Some(key) = key_from_env_files(&files)? {
        let use_it = inquire::Confirm::new(&format!(
            "{API_KEY_ENV} found \n  Do you want to use API key from env file ?"
        ))
        .with_default(true)
        .prompt()?;
        if use_it {
            return Ok(key);
        }
    }

    prompt_for_key()
}

/// Env files read for the API key, in increasing priority.
///
/// Follows the dotenv-flow convention: `.env`, `.env.local`, then the
/// `NODE_ENV` specific pair. `.env.local` is skipped for `NODE_ENV=test`.
pub fn env_file_candidates(cwd: &Path, node_env: Option<&str>) -> Vec<PathBuf> {
    let mut files = vec![cwd.join(".env")];
    if node_env != Some("test") {
        files.push(cwd.join(".env.local"));
    }
    if let Some(env) = node_env.filter(|e| !e.is_empty()) {
        files.push(cwd.join(format!(".env.{env}")));
        files.push(cwd.join(format!(".env.{env}.local")));
    }
    files
}

/// Looks up [`API_KEY_ENV`] in `files`; later files win.
pub fn key_from_env_files(files: &[PathBuf]) -> Result<Option<String>, CliError> {
    let mut found = None;

    for path in files.iter().filter(|p| p.is_file()) {
        let entries = dotenvy::from_path_iter(path).map_err(|source| CliError::EnvFile {
            path: path.clone(),
            source,
        })?;
        for entry in entries {
            let (key, value) = entry.map_err(|source| CliError::EnvFile {
                path: path.clone(),
                source,
            })?;
            if key == API_KEY_ENV {
                found = Some(value);
            }
        }
    }

    Ok(found.filter(|k| !k.trim().is_empty()))
}

fn prompt_for_key() -> Result<String, CliError> {
    let key = inquire::Text::new("Please enter your Flotiq API key:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Ok(Validation::Invalid("API key cannot be empty.".into()))
            } else {
                Ok(Validation::Valid)
            }
        })
        .prompt()?;
    Ok(key.trim().to_string())
}
