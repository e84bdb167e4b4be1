//! File system operations and path handling utilities

use crate::utils::error_helpers::convert_local_io_error;
use std::path::Path;

/// Ensure a directory exists, creating it if necessary
pub fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> crate::Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)
            .map_err(|e| convert_local_io_error(e, &path.to_string_lossy()))?;
    }
    Ok(())
}

/// Read a local file into memory
pub async fn read_local_file<P: AsRef<Path>>(path: P) -> crate::Result<Vec<u8>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| convert_local_io_error(e, &path.to_string_lossy()))?;
    Ok(bytes)
}

/// Write bytes to a local file, creating its parent directory first
pub async fn write_local_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> crate::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_directory_exists(parent)?;
    }

    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| convert_local_io_error(e, &path.to_string_lossy()))?;
    Ok(())
}
