//! Tar payload creation and checksums
//!
//! - Standard tar format, no compression
//! - Deterministic file ordering
//! - fsync archive after creation
//! - CRC32 checksum recorded at creation, verified before any restore load

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use tar::Builder;

use super::errors::{ArchiveError, ArchiveResult};

/// Create a tar archive from a schema directory.
pub fn create_tar_archive(source_dir: &Path, output_path: &Path) -> ArchiveResult<()> {
    let file = File::create(output_path).map_err(|e| {
        ArchiveError::write_failed_with_source(
            format!("failed to create archive file: {}", output_path.display()),
            e,
        )
    })?;

    let writer = BufWriter::new(file);
    let mut builder = Builder::new(writer);

    // Sorted entries so identical content yields identical archives
    let mut entries = collect_entries(source_dir)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (archive_path, fs_path) in entries {
        if fs_path.is_dir() {
            builder.append_dir(&archive_path, &fs_path).map_err(|e| {
                ArchiveError::write_failed(format!(
                    "failed to add directory to archive: {}: {}",
                    archive_path, e
                ))
            })?;
        } else {
            let mut file = File::open(&fs_path)
                .map_err(|e| ArchiveError::io_error_at_path(&fs_path, e))?;

            builder.append_file(&archive_path, &mut file).map_err(|e| {
                ArchiveError::write_failed(format!(
                    "failed to add file to archive: {}: {}",
                    archive_path, e
                ))
            })?;
        }
    }

    let writer = builder
        .into_inner()
        .map_err(|e| ArchiveError::write_failed(format!("failed to finish archive: {}", e)))?;

    let file = writer
        .into_inner()
        .map_err(|e| ArchiveError::write_failed(format!("failed to flush archive: {}", e)))?;

    file.sync_all().map_err(|e| {
        ArchiveError::write_failed_with_source(
            format!("failed to fsync archive: {}", output_path.display()),
            e,
        )
    })?;

    Ok(())
}

fn collect_entries(dir: &Path) -> ArchiveResult<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    collect_entries_recursive(dir, "", &mut entries)?;
    Ok(entries)
}

fn collect_entries_recursive(
    current_dir: &Path,
    prefix: &str,
    entries: &mut Vec<(String, PathBuf)>,
) -> ArchiveResult<()> {
    let mut dir_entries: Vec<_> = fs::read_dir(current_dir)
        .map_err(|e| ArchiveError::io_error_at_path(current_dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ArchiveError::io_error_at_path(current_dir, e))?;

    dir_entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    for entry in dir_entries {
        let fs_path = entry.path();
        let file_name = entry.file_name();
        let file_name_str = file_name.to_string_lossy();

        let archive_path = if prefix.is_empty() {
            file_name_str.to_string()
        } else {
            format!("{}/{}", prefix, file_name_str)
        };

        entries.push((archive_path.clone(), fs_path.clone()));

        if fs_path.is_dir() {
            collect_entries_recursive(&fs_path, &archive_path, entries)?;
        }
    }

    Ok(())
}

/// Compute the CRC32 checksum of a file, formatted as `crc32:xxxxxxxx`.
pub fn compute_file_checksum(path: &Path) -> ArchiveResult<String> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| ArchiveError::io_error_at_path(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| ArchiveError::io_error_at_path(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("crc32:{:08x}", hasher.finalize()))
}

/// Delete a partial archive if it exists.
///
/// A failed archive creation must leave no artifact behind.
pub fn cleanup_partial_archive(archive_path: &Path) {
    if archive_path.exists() {
        let _ = fs::remove_file(archive_path);
    }
}
