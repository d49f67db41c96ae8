//! Local upload store for the renter's supporting documents.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Format used to prefix stored uploads and name generated documents.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const FALLBACK_NAME: &str = "arquivo";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create upload directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write upload {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file received in a multipart submission, still held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist an optional upload as `<stamp>_<role>_<sanitized name>`.
    ///
    /// Absent handles and handles with an empty filename yield `Ok(None)`.
    pub fn save(
        &self,
        file: Option<UploadedFile>,
        stamp: &str,
        role: &str,
    ) -> Result<Option<PathBuf>, StorageError> {
        let file = match file {
            Some(f) if !f.filename.trim().is_empty() => f,
            _ => return Ok(None),
        };

        fs::create_dir_all(&self.root).map_err(|source| StorageError::CreateDir {
            path: self.root.clone(),
            source,
        })?;

        let stored_name = format!("{}_{}_{}", stamp, role, secure_filename(&file.filename));
        let path = self.root.join(stored_name);

        fs::write(&path, &file.data).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;

        log::info!(
            "Stored upload '{}' as {} ({} bytes)",
            file.filename,
            path.display(),
            file.data.len()
        );
        Ok(Some(path))
    }
}

/// Reduce a client-supplied filename to a single safe path component.
pub fn secure_filename(name: &str) -> String {
    let flattened = name.replace(['/', '\\'], " ");
    let cleaned = sanitize_filename::sanitize(flattened.trim());

    let mut result = String::with_capacity(cleaned.len());
    for ch in cleaned.chars() {
        if ch.is_whitespace() {
            if !result.ends_with('_') {
                result.push('_');
            }
        } else {
            result.push(ch);
        }
    }

    let result = result.trim_matches(|c| c == '.' || c == '_').to_string();
    if result.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        result
    }
}
