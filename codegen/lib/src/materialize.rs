//! Archive extraction and post-processing of the generated sources.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::MaterializeError;

/// Generated model files that may carry a duplicated `DataSource` import.
pub const DUPLICATE_IMPORT_PATTERNS: [&str; 3] = [
    "src/models/*WithoutInternal.ts",
    "src/models/*WithoutRequired.ts",
    "src/models/*WithoutInternalAllOf*.ts",
];

/// The import statement the generator emits twice in those files.
pub const DUPLICATE_IMPORT: &str = "import { DataSource, DataSourceFromJSON } from './DataSource';";

/// Extracts `archive` into `bundle_path` and removes duplicate imports.
///
/// ## Errors
///
/// Returns [`MaterializeError`] if the archive is corrupt, contains paths
/// escaping `bundle_path`, or files cannot be written.
pub fn materialize(archive: &[u8], bundle_path: &Path) -> Result<(), MaterializeError> {
    let extracted = extract_zip(archive, bundle_path)?;
    tracing::debug!(files = extracted, path = %bundle_path.display(), "Extracted SDK archive");

    let cleaned = clean_duplicate_imports(bundle_path)?;
    if cleaned > 0 {
        tracing::debug!(files = cleaned, "Removed duplicate imports");
    }
    Ok(())
}

/// Extracts every entry of a zip archive below `out_dir`.
///
/// Every entry is decoded through rawzip's verifying reader, so data that
/// does not match the recorded CRC or size is rejected before it is written.
///
/// Returns the number of files written.
fn extract_zip(archive: &[u8], out_dir: &Path) -> Result<usize, MaterializeError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| MaterializeError::Io { path, source }
    };

    let archive = rawzip::ZipArchive::from_slice(archive)
        .map_err(|e| MaterializeError::Archive(format!("{e:?}")))?;

    fs::create_dir_all(out_dir).map_err(io_err(out_dir))?;

    let mut written = 0;
    for entry in archive.entries() {
        let entry = entry.map_err(|e| MaterializeError::Archive(format!("bad entry: {e:?}")))?;

        // Normalization folds `..` away, so escaping names are caught on the raw bytes.
        let raw = entry.file_path();
        if is_unsafe_entry_name(raw.as_bytes()) {
            return Err(MaterializeError::UnsafePath(
                String::from_utf8_lossy(raw.as_bytes()).into_owned(),
            ));
        }
        let filename = raw
            .try_normalize()
            .map_err(|e| MaterializeError::Archive(format!("bad entry name: {e:?}")))?
            .as_ref()
            .to_string();

        let out_path = out_dir.join(&filename);
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(io_err(&out_path))?;
            continue;
        }

        let slice_entry = archive
            .get_entry(entry.wayfinder())
            .map_err(|e| MaterializeError::Archive(format!("{filename}: {e:?}")))?;

        let mut contents = Vec::new();
        let decoded = match entry.compression_method() {
            rawzip::CompressionMethod::Store => slice_entry
                .verifying_reader(slice_entry.data())
                .read_to_end(&mut contents),
            rawzip::CompressionMethod::Deflate => slice_entry
                .verifying_reader(flate2::read::DeflateDecoder::new(slice_entry.data()))
                .read_to_end(&mut contents),
            method => {
                return Err(MaterializeError::Archive(format!(
                    "{filename}: unsupported compression method {method:?}"
                )));
            }
        };
        decoded.map_err(|e| MaterializeError::Archive(format!("{filename}: {e}")))?;

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        fs::write(&out_path, contents).map_err(io_err(&out_path))?;
        written += 1;
    }

    Ok(written)
}

/// Whether a raw entry name is absolute or climbs out of the extraction root.
///
/// Both `/` and `\` count as separators.
fn is_unsafe_entry_name(raw: &[u8]) -> bool {
    let is_separator = |b: &u8| *b == b'/' || *b == b'\\';

    if raw.first().is_some_and(is_separator) {
        return true;
    }
    // Drive prefix such as `C:`.
    if raw.len() >= 2 && raw[0].is_ascii_alphabetic() && raw[1] == b':' {
        return true;
    }
    raw.split(is_separator).any(|segment| segment == b"..")
}

/// Removes [`DUPLICATE_IMPORT`] lines from the generated model files.
///
/// Only whole lines equal to the import (ignoring the line terminator) are
/// dropped; every other byte is preserved. Files without the import are not
/// rewritten. Running this more than once has no further effect.
///
/// Returns the number of files changed.
///
/// ## Errors
///
/// Returns [`MaterializeError`] if a matching file cannot be read or written.
pub fn clean_duplicate_imports(root: &Path) -> Result<usize, MaterializeError> {
    let mut changed = 0;

    for pattern in DUPLICATE_IMPORT_PATTERNS {
        let pattern = format!(
            "{}/{pattern}",
            glob::Pattern::escape(&root.to_string_lossy())
        );

        // Unreadable directory entries are skipped like missing files.
        for path in glob::glob(&pattern)?.filter_map(Result::ok) {
            let io_err = |source| MaterializeError::Io {
                path: path.clone(),
                source,
            };
            let contents = fs::read_to_string(&path).map_err(io_err)?;
            if let Some(cleaned) = strip_duplicate_import(&contents) {
                fs::write(&path, cleaned).map_err(io_err)?;
                tracing::trace!(path = %path.display(), "Removed duplicate import");
                changed += 1;
            }
        }
    }

    Ok(changed)
}

/// Returns the contents without duplicate import lines, or `None` when
/// there is nothing to remove.
fn strip_duplicate_import(contents: &str) -> Option<String> {
    let is_duplicate = |line: &str| line.trim_end_matches(['\r', '\n']) == DUPLICATE_IMPORT;

    if !contents.split_inclusive('\n').any(is_duplicate) {
        return None;
    }

    Some(
        contents
            .split_inclusive('\n')
            .filter(|line| !is_duplicate(*line))
            .collect(),
    )
}
