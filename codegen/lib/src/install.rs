//! Moving a finished bundle into the caller's project.
//!
//! The destination is always replaced wholesale: an existing directory is
//! removed before the new tree is moved in, never merged or patched.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::InstallError;

/// Replaces `destination` with the bundle at `bundle_path`.
///
/// The bundle is moved with a single `rename`. When the working directory
/// lives on another filesystem, the bundle is first copied into a hidden
/// staging directory beside `destination` and that complete tree is renamed
/// into place, so `destination` never holds a mix of old and new files.
///
/// ## Errors
///
/// Returns [`InstallError`] if the old output cannot be removed or the
/// bundle cannot be moved.
pub fn install(bundle_path: &Path, destination: &Path) -> Result<(), InstallError> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| InstallError::Move {
            from: bundle_path.to_path_buf(),
            to: destination.to_path_buf(),
            source,
        })?;
    }

    if destination.symlink_metadata().is_ok() {
        tracing::info!(path = %destination.display(), "Found existing SDK, cleaning up");
        remove_existing(destination)?;
    }

    tracing::info!(path = %destination.display(), "Moving SDK into place");
    match fs::rename(bundle_path, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            tracing::debug!("Bundle is on another filesystem, staging a copy");
            install_across_devices(bundle_path, destination)
        }
        Err(source) => Err(InstallError::Move {
            from: bundle_path.to_path_buf(),
            to: destination.to_path_buf(),
            source,
        }),
    }
}

fn remove_existing(path: &Path) -> Result<(), InstallError> {
    let result = if path.is_dir() && !path.is_symlink() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|source| InstallError::Remove {
        path: path.to_path_buf(),
        source,
    })
}

fn install_across_devices(bundle_path: &Path, destination: &Path) -> Result<(), InstallError> {
    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // Dropped on every exit path, taking a partial copy with it.
    let staging = tempfile::Builder::new()
        .prefix(".codegen-ts-staging-")
        .tempdir_in(parent)
        .map_err(|source| InstallError::Copy {
            path: parent.to_path_buf(),
            source,
        })?;
    let staged = staging.path().join("bundle");

    copy_tree(bundle_path, &staged)?;

    fs::rename(&staged, destination).map_err(|source| InstallError::Move {
        from: staged.clone(),
        to: destination.to_path_buf(),
        source,
    })?;

    // The new SDK is in place; a leftover source tree only wastes temp space.
    if let Err(e) = fs::remove_dir_all(bundle_path) {
        tracing::warn!(path = %bundle_path.display(), error = %e, "Failed to remove working copy");
    }
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> Result<(), InstallError> {
    let copy_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| InstallError::Copy { path, source }
    };

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            InstallError::Copy {
                path,
                source: e.into(),
            }
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| InstallError::Copy {
                path: entry.path().to_path_buf(),
                source: std::io::Error::other(e),
            })?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(copy_err(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(copy_err(entry.path()))?;
        }
    }
    Ok(())
}
