//! Trait definitions for the pipeline module.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::PipelineError;
use super::metadata::MetaData;

/// Writes film metadata into an image file, e.g. through exiftool.
#[async_trait]
pub trait MetadataTagger: Send + Sync {
    /// Returns the name of this tagger implementation.
    fn name(&self) -> &str;

    /// Writes `metadata` into `file` in place.
    async fn tag(&self, file: &Path, metadata: &MetaData) -> Result<(), PipelineError>;
}

/// Relocates processed files to long-term storage.
#[async_trait]
pub trait ArchiveMover: Send + Sync {
    /// Moves `file` into `destination_dir`, keeping its name. Returns the new path.
    async fn move_file(&self, file: &Path, destination_dir: &Path)
        -> Result<PathBuf, PipelineError>;
}
