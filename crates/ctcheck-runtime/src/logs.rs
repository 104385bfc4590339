//! Per-container log files for drivers that capture output themselves.

use std::fs::File;
use std::path::{Path, PathBuf};

use ctcheck_common::error::{CheckError, Result};

/// Returns the log file path for a container.
#[must_use]
pub fn log_path(data_dir: &Path, container_id: &str) -> PathBuf {
    data_dir.join("logs").join(format!("{container_id}.log"))
}

/// Creates (or truncates) the log file a process will write into.
///
/// Creates the log directory if it does not exist.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created.
pub fn create_log(data_dir: &Path, container_id: &str) -> Result<File> {
    let path = log_path(data_dir, container_id);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CheckError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    File::create(&path).map_err(|e| CheckError::Io { path, source: e })
}

/// Reads container logs from disk.
///
/// Returns an empty string if the log file does not exist yet.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_logs(data_dir: &Path, container_id: &str) -> Result<String> {
    let path = log_path(data_dir, container_id);
    if !path.exists() {
        return Ok(String::new());
    }
    std::fs::read(&path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| CheckError::Io { path, source: e })
}

/// Deletes a container's log file. A missing file is not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn remove_log(data_dir: &Path, container_id: &str) -> Result<()> {
    let path = log_path(data_dir, container_id);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CheckError::Io { path, source: e }),
    }
}
