//! Durable filesystem primitives
//!
//! Every on-disk structure in univault is replaced whole, never edited in
//! place: write to a sibling temp path, fsync, rename over the target,
//! fsync the parent. Directory swaps follow the same rename discipline with
//! an explicit rollback path.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// fsync a directory
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    let d = OpenOptions::new().read(true).open(dir)?;
    d.sync_all()
}

/// fsync a directory tree: every file, then every directory bottom-up
pub fn fsync_recursive(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fsync_recursive(&path)?;
        } else {
            let file = OpenOptions::new().read(true).open(&path)?;
            file.sync_all()?;
        }
    }

    fsync_dir(dir)
}

/// Write a file atomically: temp sibling, fsync, rename, fsync parent.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp = sibling_path(path, ".tmp")?;
    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    fs::rename(&tmp, path)?;
    fsync_dir(parent)
}

/// Staging sibling for a directory about to replace `dir`.
pub fn staging_dir_path(dir: &Path) -> io::Result<PathBuf> {
    sibling_path(dir, ".staged")
}

/// Sibling path holding the previous content during a swap.
pub fn old_dir_path(dir: &Path) -> io::Result<PathBuf> {
    sibling_path(dir, ".old")
}

fn sibling_path(path: &Path, suffix: &str) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let parent = path.parent().unwrap_or(Path::new("."));
    Ok(parent.join(format!("{}{}", name.to_string_lossy(), suffix)))
}

/// Atomically replace `target` with `staged`.
///
/// 1. Move target -> target.old (skipped when target does not exist yet)
/// 2. Move staged -> target; on failure move target.old back and report
/// 3. fsync parent
/// 4. Delete target.old (best-effort; stale .old never affects correctness)
pub fn atomic_replace_dir(target: &Path, staged: &Path) -> io::Result<()> {
    let old = old_dir_path(target)?;
    let parent = target.parent().unwrap_or(Path::new("."));

    // A stale .old from an earlier failed swap must not block this one
    if old.exists() {
        fs::remove_dir_all(&old)?;
    }

    let had_target = target.exists();
    if had_target {
        fs::rename(target, &old)?;
    }

    if let Err(e) = fs::rename(staged, target) {
        return Err(swap_failure(target, &old, had_target, e));
    }

    fsync_dir(parent)?;

    if had_target {
        let _ = fs::remove_dir_all(&old);
    }

    Ok(())
}

/// Restore the previous content after a failed swap.
///
/// When the rename-back also fails the combined error names both
/// failures, so callers never report the target as untouched while it is
/// actually missing.
fn swap_failure(target: &Path, old: &Path, had_target: bool, swap_err: io::Error) -> io::Error {
    if had_target {
        if let Err(restore_err) = fs::rename(old, target) {
            return io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "swap of {} failed: {}; previous content not restored from {}: {}",
                    target.display(),
                    swap_err,
                    old.display(),
                    restore_err
                ),
            );
        }
    }
    swap_err
}

/// Remove a directory tree, ignoring errors.
pub fn remove_dir_best_effort(dir: &Path) {
    if dir.exists() {
        let _ = fs::remove_dir_all(dir);
    }
}
