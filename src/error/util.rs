//! Utility functions for error handling
//!
//! File access helpers that attach the path and purpose to every failure.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Result, VecorelError};

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(VecorelError::io(
            path,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found (needed for: {purpose})"),
            ),
        ));
    }

    if !path.is_file() {
        return Err(VecorelError::io(
            path,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path is not a file (expected a file for: {purpose})"),
            ),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let kind = e.kind();
        let context = match kind {
            io::ErrorKind::PermissionDenied => "permission denied - check file permissions".to_string(),
            _ => format!("failed to open file for: {purpose}: {e}"),
        };
        VecorelError::io(path, io::Error::new(kind, context))
    })
}

/// Check if a directory exists and is readable
pub fn validate_directory(path: &Path, purpose: &str) -> Result<()> {
    if !path.is_dir() {
        return Err(VecorelError::io(
            path,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found (needed for: {purpose})"),
            ),
        ));
    }

    fs::read_dir(path).map(|_| ()).map_err(|e| VecorelError::io(path, e))
}

/// Safely read a file to string with rich error information
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    let mut file = safe_open_file(path, purpose)?;

    let mut content = String::new();
    io::Read::read_to_string(&mut file, &mut content).map_err(|e| {
        let kind = e.kind();
        let context = match kind {
            io::ErrorKind::InvalidData => {
                "file contains invalid UTF-8 data - cannot read as text".to_string()
            }
            _ => format!("failed to read file content for: {purpose}: {e}"),
        };
        VecorelError::io(path, io::Error::new(kind, context))
    })?;
    Ok(content)
}

/// Create a file for writing, creating missing parent directories
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| VecorelError::io(parent, e))?;
    }
    fs::File::create(path).map_err(|e| {
        let kind = e.kind();
        VecorelError::io(
            path,
            io::Error::new(kind, format!("failed to create file for: {purpose}: {e}")),
        )
    })
}
