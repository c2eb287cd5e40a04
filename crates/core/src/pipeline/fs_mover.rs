//! Filesystem-based archive mover.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::error::PipelineError;
use super::traits::ArchiveMover;

/// Moves files with `rename`, falling back to copy and delete across devices.
#[derive(Debug, Clone, Default)]
pub struct FsArchiveMover;

impl FsArchiveMover {
    pub fn new() -> Self {
        Self
    }

    /// Attempts an atomic move (rename). Returns Ok(true) if successful,
    /// Ok(false) if a cross-filesystem move is needed.
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // EXDEV is 18 on Linux
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }
}

#[async_trait]
impl ArchiveMover for FsArchiveMover {
    async fn move_file(&self, file: &Path, destination_dir: &Path) -> Result<PathBuf, PipelineError> {
        let not_found = || PipelineError::SourceNotFound {
            path: file.to_path_buf(),
        };
        let name = file.file_name().ok_or_else(not_found)?;
        if !fs::try_exists(file).await.unwrap_or(false) {
            return Err(not_found());
        }

        fs::create_dir_all(destination_dir)
            .await
            .map_err(|error| PipelineError::DirectoryCreationFailed {
                path: destination_dir.to_path_buf(),
                error,
            })?;

        let destination = destination_dir.join(name);
        let moved = Self::try_atomic_move(file, &destination)
            .await
            .map_err(|e| PipelineError::move_failed(file.to_path_buf(), destination.clone(), e))?;

        if !moved {
            debug!(from = %file.display(), to = %destination.display(), "Copying across devices");
            fs::copy(file, &destination)
                .await
                .map_err(|error| PipelineError::CopyFailed {
                    from: file.to_path_buf(),
                    to: destination.clone(),
                    error,
                })?;
            fs::remove_file(file).await?;
        }

        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_into_new_directory() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("IMG_0001.CR3");
        fs::write(&source, b"raw").await.unwrap();
        let archive = temp.path().join("archive").join("roll-1");

        let moved = FsArchiveMover::new()
            .move_file(&source, &archive)
            .await
            .unwrap();

        assert_eq!(moved, archive.join("IMG_0001.CR3"));
        assert!(!source.exists());
        assert_eq!(fs::read(&moved).await.unwrap(), b"raw");
    }

    #[tokio::test]
    async fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = FsArchiveMover::new()
            .move_file(&temp.path().join("nope.JPG"), temp.path())
            .await;
        assert!(matches!(result, Err(PipelineError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_overwrites_existing_destination() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("archive");
        fs::create_dir_all(&archive).await.unwrap();
        fs::write(archive.join("IMG_0002.JPG"), b"old").await.unwrap();
        let source = temp.path().join("IMG_0002.JPG");
        fs::write(&source, b"new").await.unwrap();

        let moved = FsArchiveMover::new()
            .move_file(&source, &archive)
            .await
            .unwrap();
        assert_eq!(fs::read(&moved).await.unwrap(), b"new");
    }
}
