//! Relocation of an entry into (or out of) the holding area.
//!
//! Rename first; on any rename failure fall back to copy + remove of the
//! original. The rename step is injectable so tests can force the fallback
//! path without a real cross-device mount.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::StoreError;

/// Which relocation strategy succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocateMode {
    /// Atomic rename on the same filesystem.
    Renamed,
    /// Copy into place followed by removal of the original.
    Copied,
}

/// Relocate `source` to `dest` using the real `fs::rename` as the first
/// strategy.
pub fn relocate(source: &Path, dest: &Path, is_dir: bool) -> Result<RelocateMode, StoreError> {
    relocate_with(|s, d| fs::rename(s, d), source, dest, is_dir)
}

/// Relocate with an injectable rename step.
///
/// The original is only removed once the copy is fully on disk; if that
/// removal fails, the copy is retained and a [`StoreError::SourceRemoval`]
/// failure is reported.
pub fn relocate_with<F>(
    rename: F,
    source: &Path,
    dest: &Path,
    is_dir: bool,
) -> Result<RelocateMode, StoreError>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    match rename(source, dest) {
        Ok(()) => return Ok(RelocateMode::Renamed),
        Err(e) => {
            tracing::debug!("rename of {} failed ({e}), falling back to copy", source.display());
        }
    }

    if is_dir {
        copy_dir_recursive(source, dest)?;
    } else {
        copy_file(source, dest)?;
    }

    let removal = if is_dir {
        fs::remove_dir_all(source)
    } else {
        fs::remove_file(source)
    };
    if let Err(e) = removal {
        return Err(StoreError::SourceRemoval {
            path: source.to_path_buf(),
            source: e,
        });
    }

    Ok(RelocateMode::Copied)
}

/// Byte copy of a single file, permissions included.
fn copy_file(source: &Path, dest: &Path) -> Result<(), StoreError> {
    fs::copy(source, dest).map_err(|e| StoreError::io(source, e))?;
    Ok(())
}

/// Recursively copy a directory tree. Symlinks are recreated as links, not
/// followed.
fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dest).map_err(|e| StoreError::io(dest, e))?;
    if let Ok(meta) = fs::metadata(source) {
        let _ = fs::set_permissions(dest, meta.permissions());
    }

    let entries = fs::read_dir(source).map_err(|e| StoreError::io(source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(source, e))?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| StoreError::io(&path, e))?;

        if file_type.is_dir() {
            copy_dir_recursive(&path, &dest_path)?;
        } else if file_type.is_symlink() {
            copy_symlink(&path, &dest_path)?;
        } else {
            copy_file(&path, &dest_path)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, dest: &Path) -> Result<(), StoreError> {
    let target = fs::read_link(source).map_err(|e| StoreError::io(source, e))?;
    std::os::unix::fs::symlink(&target, dest).map_err(|e| StoreError::io(dest, e))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, dest: &Path) -> Result<(), StoreError> {
    copy_file(source, dest)
}
