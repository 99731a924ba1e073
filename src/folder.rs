use std::{fs, path::Path};

use walkdir::WalkDir;

/// Total size in bytes of every file below `path`.
///
/// Directories are walked recursively. Files are measured through `stat`,
/// so symbolic links count with the size of their target. Entries that
/// cannot be listed or measured (removed mid-scan, dangling links,
/// permission errors) are skipped, and a missing or unreadable root yields
/// `0`.
pub fn folder_size_bytes(path: impl AsRef<Path>) -> u64 {
    WalkDir::new(path.as_ref())
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::debug!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| !entry.file_type().is_dir())
        .filter_map(|entry| match fs::metadata(entry.path()) {
            Ok(metadata) if metadata.is_file() => Some(metadata.len()),
            Ok(_) => None,
            Err(err) => {
                log::debug!("skipping {}: {err}", entry.path().display());
                None
            }
        })
        .sum()
}

/// Converts a byte count to mebibytes, the unit of the dataset report.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
