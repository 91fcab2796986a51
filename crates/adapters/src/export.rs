use std::fs;
use std::path::PathBuf;

use tablescope_core::export::{ExportSinkError, Exporter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory at {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write export file at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("export file name `{0}` has no usable characters")]
    InvalidFileName(String),
}

#[derive(Debug, Clone)]
pub struct DirectoryExporter {
    directory: PathBuf,
}

impl DirectoryExporter {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn write(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, ExportError> {
        let file_name = sanitize_file_name(file_name)?;

        fs::create_dir_all(&self.directory).map_err(|source| ExportError::CreateDir {
            path: self.directory.display().to_string(),
            source,
        })?;

        let path = self.directory.join(file_name);
        fs::write(&path, contents).map_err(|source| ExportError::Write {
            path: path.display().to_string(),
            source,
        })?;
        Ok(path)
    }
}

impl Exporter for DirectoryExporter {
    fn deliver(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, ExportSinkError> {
        self.write(file_name, contents)
            .map_err(|error| ExportSinkError::new(error.to_string()))
    }
}

// Table names come from the remote catalog and end up in the file name.
fn sanitize_file_name(file_name: &str) -> Result<String, ExportError> {
    let cleaned = file_name
        .chars()
        .map(|ch| {
            if ch.is_control() || matches!(ch, '/' | '\\') {
                '_'
            } else {
                ch
            }
        })
        .collect::<String>();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return Err(ExportError::InvalidFileName(file_name.to_string()));
    }
    Ok(cleaned.to_string())
}
