//! Moving a pre-populated vendor directory into the packages layer

use crate::error::{ComposerError, ComposerResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What happened to the app's vendor directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// Entries were moved and the directory replaced by a symlink
    Moved { entries: usize },
    /// The vendor path is already a symlink
    AlreadyLinked,
    /// Missing, empty, or not a directory
    Skipped,
}

/// Move the entries of `vendor` into `target` and link `vendor` to `target`
pub async fn relocate_vendor(vendor: PathBuf, target: PathBuf) -> ComposerResult<Relocation> {
    tokio::task::spawn_blocking(move || relocate(&vendor, &target))
        .await
        .map_err(|e| ComposerError::Internal(format!("vendor relocation task failed: {}", e)))?
}

fn relocate(vendor: &Path, target: &Path) -> ComposerResult<Relocation> {
    let meta = match fs::symlink_metadata(vendor) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Relocation::Skipped),
        Err(e) => return Err(ComposerError::io(format!("inspecting {}", vendor.display()), e)),
    };

    if meta.file_type().is_symlink() {
        return Ok(Relocation::AlreadyLinked);
    }
    if !meta.is_dir() {
        return Ok(Relocation::Skipped);
    }

    let entries = fs::read_dir(vendor)
        .and_then(|entries| entries.collect::<io::Result<Vec<_>>>())
        .map_err(|e| ComposerError::io(format!("reading {}", vendor.display()), e))?;
    if entries.is_empty() {
        return Ok(Relocation::Skipped);
    }

    fs::create_dir_all(target)
        .map_err(|e| ComposerError::io(format!("creating {}", target.display()), e))?;

    for entry in &entries {
        let from = entry.path();
        let to = target.join(entry.file_name());
        move_path(&from, &to).map_err(|e| {
            ComposerError::io(format!("moving {} to {}", from.display(), to.display()), e)
        })?;
    }

    fs::remove_dir(vendor)
        .map_err(|e| ComposerError::io(format!("removing {}", vendor.display()), e))?;
    symlink(target, vendor).map_err(|e| {
        ComposerError::io(
            format!("linking {} to {}", vendor.display(), target.display()),
            e,
        )
    })?;

    Ok(Relocation::Moved {
        entries: entries.len(),
    })
}

/// Rename, or copy and delete when rename fails (e.g. across filesystems)
fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    if fs::symlink_metadata(to).is_ok() {
        remove_path(to)?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("rename {} failed ({}), copying", from.display(), e);
            copy_recursive(from, to)?;
            remove_path(from)
        }
    }
}

fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(from)?;
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        symlink(&fs::read_link(from)?, to)
    } else if file_type.is_dir() {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        fs::set_permissions(to, meta.permissions())
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(_original: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are only supported on unix",
    ))
}
