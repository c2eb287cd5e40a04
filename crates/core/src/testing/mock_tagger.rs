//! Mock metadata tagger for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::pipeline::{MetaData, MetadataTagger, PipelineError};

/// Tagger that records what it was asked to write instead of touching files.
#[derive(Debug, Clone, Default)]
pub struct MockTagger {
    tagged: Arc<RwLock<Vec<(PathBuf, MetaData)>>>,
    should_fail: Arc<RwLock<bool>>,
}

impl MockTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every successful tag call, in order.
    pub async fn tagged(&self) -> Vec<(PathBuf, MetaData)> {
        self.tagged.read().await.clone()
    }

    /// Make every tag call fail until reset.
    pub async fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().await = fail;
    }
}

#[async_trait]
impl MetadataTagger for MockTagger {
    fn name(&self) -> &str {
        "mock"
    }

    async fn tag(&self, file: &Path, metadata: &MetaData) -> Result<(), PipelineError> {
        if *self.should_fail.read().await {
            return Err(PipelineError::tag_failed(file, "mock tagger failure"));
        }
        self.tagged
            .write()
            .await
            .push((file.to_path_buf(), metadata.clone()));
        Ok(())
    }
}
