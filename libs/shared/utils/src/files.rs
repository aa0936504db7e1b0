use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use strict_path::{PathBoundary, StrictPathError};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use shared_models::error::AppError;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File {0} already exists")]
    AlreadyExists(PathBuf),

    #[error("File {0} not found")]
    NotFound(PathBuf),

    #[error("{name} resolves outside {root}")]
    OutsideRoot { name: String, root: PathBuf },

    #[error("Cannot use {0} as a file root: {1}")]
    InvalidRoot(PathBuf, #[source] StrictPathError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            ErrorKind::AlreadyExists => FileError::AlreadyExists(path.to_path_buf()),
            ErrorKind::NotFound => FileError::NotFound(path.to_path_buf()),
            _ => FileError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::OutsideRoot { .. } => AppError::BadRequest(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

/// A directory that every resolved file name must stay inside.
#[derive(Debug, Clone)]
pub struct FileRoot {
    boundary: PathBoundary,
}

impl FileRoot {
    /// Opens `dir` as a root, creating it when missing.
    pub fn open(dir: &Path) -> Result<Self, FileError> {
        let boundary = PathBoundary::try_new_create(dir)
            .map_err(|e| FileError::InvalidRoot(dir.to_path_buf(), e))?;
        Ok(Self { boundary })
    }

    /// Root of a single configured file, returned with that file's name.
    pub fn containing(file: &Path) -> Result<(Self, String), FileError> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| FileError::NotFound(file.to_path_buf()))?;
        let dir = file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        Ok((Self::open(dir)?, name))
    }

    pub fn resolve(&self, name: &str) -> Result<PathBuf, FileError> {
        let resolved = self.boundary.strict_join(name).map_err(|_| FileError::OutsideRoot {
            name: name.to_string(),
            root: self.boundary.as_ref().to_path_buf(),
        })?;
        Ok(resolved.unstrict())
    }
}

/// Plain-text file access for bill documents and audit trails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileHandler;

impl FileHandler {
    async fn ensure_parent(path: &Path) -> Result<(), FileError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FileError::io(parent, e))?;
        }
        Ok(())
    }

    /// Appends `content` to the file, creating it and its directories when missing.
    pub async fn append(path: &Path, content: &str) -> Result<(), FileError> {
        Self::ensure_parent(path).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| FileError::io(path, e))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| FileError::io(path, e))?;
        file.flush().await.map_err(|e| FileError::io(path, e))?;

        debug!("Appended {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    /// Writes a file that must not exist yet.
    pub async fn write_new(path: &Path, content: &str) -> Result<(), FileError> {
        Self::ensure_parent(path).await?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| FileError::io(path, e))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| FileError::io(path, e))?;
        file.flush().await.map_err(|e| FileError::io(path, e))?;

        debug!("Created {}", path.display());
        Ok(())
    }

    pub async fn remove(path: &Path) -> Result<(), FileError> {
        fs::remove_file(path)
            .await
            .map_err(|e| FileError::io(path, e))?;
        debug!("Removed {}", path.display());
        Ok(())
    }

    pub async fn read(path: &Path) -> Result<String, FileError> {
        fs::read_to_string(path)
            .await
            .map_err(|e| FileError::io(path, e))
    }
}
