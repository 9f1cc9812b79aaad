//! Schema fingerprints and their persistence.
//!
//! A [`Fingerprint`] is the pair of timestamps of the most recently created
//! and most recently updated content type. Watch mode compares the freshly
//! fetched pair with the one stored on disk to decide whether the SDK needs
//! to be regenerated.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FingerprintError;

/// Default fingerprint file name, stored next to the installed executable.
pub const DEFAULT_FINGERPRINT_FILE: &str = "codegen-ts-watch-config.json";

/// Snapshot of the remote schema state.
///
/// The timestamps are kept exactly as the service returned them, so two
/// fingerprints are equal only when both strings match byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub created_at: String,
    pub updated_at: String,
}

impl Fingerprint {
    pub fn new(created_at: impl Into<String>, updated_at: impl Into<String>) -> Self {
        Self {
            created_at: created_at.into(),
            updated_at: updated_at.into(),
        }
    }
}

/// Trait for fingerprint storage backends.
pub trait FingerprintStore {
    /// Loads the persisted fingerprint.
    ///
    /// Returns `Ok(None)` when no baseline has been recorded yet.
    ///
    /// ## Errors
    ///
    /// Returns an error if the store exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<Fingerprint>, FingerprintError>;

    /// Replaces the persisted fingerprint.
    ///
    /// ## Errors
    ///
    /// Returns an error if writing fails. A failed save leaves the previous
    /// value in place.
    fn save(&self, fingerprint: &Fingerprint) -> Result<(), FingerprintError>;
}

/// JSON file-based fingerprint storage.
///
/// The file holds a single JSON object `{"createdAt": .., "updatedAt": ..}`.
/// Saves write a temporary sibling and rename it over the target so readers
/// never observe a half-written file.
///
/// ## Examples
///
/// ```no_run
/// use codegen_lib::{Fingerprint, FingerprintStore, JsonFingerprintFile};
///
/// let store = JsonFingerprintFile::new("/tmp/codegen-ts-watch-config.json".into());
/// store.save(&Fingerprint::new("2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z")).unwrap();
/// assert!(store.load().unwrap().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct JsonFingerprintFile {
    path: PathBuf,
}

impl JsonFingerprintFile {
    /// Creates a store backed by the given file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates a store at the default location next to the running executable.
    ///
    /// Falls back to the home directory when the executable path is unknown.
    pub fn default_path() -> Self {
        let dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir.join(DEFAULT_FINGERPRINT_FILE))
    }

    /// Returns the path to the fingerprint file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl FingerprintStore for JsonFingerprintFile {
    fn load(&self) -> Result<Option<Fingerprint>, FingerprintError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // An empty file is what an interrupted first run leaves behind.
        if contents.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, fingerprint: &Fingerprint) -> Result<(), FingerprintError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&mut tmp, fingerprint)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(path = %self.path.display(), "Persisted fingerprint");
        Ok(())
    }
}
