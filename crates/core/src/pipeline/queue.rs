use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::error::PipelineError;
use super::metadata::MetaData;
use super::traits::{ArchiveMover, MetadataTagger};
use crate::metrics;

/// A downloaded file waiting to be tagged and archived.
#[derive(Debug, Clone)]
pub struct TaggingJob {
    pub file: PathBuf,
    /// `None` archives the file untouched.
    pub metadata: Option<MetaData>,
    pub queued_at: DateTime<Utc>,
}

/// Handle for queueing downloaded files.
///
/// This is cheaply cloneable and never blocks, so it can be called from
/// download callbacks.
#[derive(Clone)]
pub struct TaggingHandle {
    tx: mpsc::UnboundedSender<TaggingJob>,
}

impl TaggingHandle {
    pub fn new(tx: mpsc::UnboundedSender<TaggingJob>) -> Self {
        Self { tx }
    }

    /// Queues `file`. Returns false, after logging, if the worker is gone.
    pub fn enqueue(&self, file: PathBuf, metadata: Option<MetaData>) -> bool {
        let job = TaggingJob {
            file,
            metadata,
            queued_at: Utc::now(),
        };
        match self.tx.send(job) {
            Ok(()) => true,
            Err(e) => {
                error!(file = %e.0.file.display(), "Failed to queue file for tagging");
                false
            }
        }
    }
}

/// Background task that tags queued files and moves them to the archive
pub struct TaggingWorker {
    rx: mpsc::UnboundedReceiver<TaggingJob>,
    tagger: Arc<dyn MetadataTagger>,
    mover: Arc<dyn ArchiveMover>,
    destination_dir: PathBuf,
}

impl TaggingWorker {
    pub fn new(
        rx: mpsc::UnboundedReceiver<TaggingJob>,
        tagger: Arc<dyn MetadataTagger>,
        mover: Arc<dyn ArchiveMover>,
        destination_dir: PathBuf,
    ) -> Self {
        Self {
            rx,
            tagger,
            mover,
            destination_dir,
        }
    }

    /// Run the worker, consuming jobs until every handle is dropped
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(tagger = self.tagger.name(), "Tagging worker started");

        while let Some(job) = self.rx.recv().await {
            if let Err(e) = self.process(job).await {
                error!(error = %e, "Failed to archive file");
            }
        }

        info!("Tagging worker shutting down");
    }

    /// Tags one file, then archives it even if tagging failed.
    pub async fn process(&self, job: TaggingJob) -> Result<PathBuf, PipelineError> {
        debug!(
            file = %job.file.display(),
            waited_ms = (Utc::now() - job.queued_at).num_milliseconds(),
            "Processing file"
        );

        if let Some(metadata) = &job.metadata {
            if let Err(e) = self.tagger.tag(&job.file, metadata).await {
                warn!(file = %job.file.display(), error = %e, "Tagging failed, archiving untagged");
                metrics::FILES_PROCESSED
                    .with_label_values(&["tag_failed"])
                    .inc();
            }
        }

        match self.mover.move_file(&job.file, &self.destination_dir).await {
            Ok(path) => {
                info!(file = %path.display(), "File archived");
                metrics::FILES_PROCESSED
                    .with_label_values(&["archived"])
                    .inc();
                Ok(path)
            }
            Err(e) => {
                metrics::FILES_PROCESSED
                    .with_label_values(&["move_failed"])
                    .inc();
                Err(e)
            }
        }
    }
}

/// Create a complete tagging pipeline
///
/// Returns:
/// - `TaggingHandle` - for queueing files (clone this to share across tasks)
/// - `TaggingWorker` - spawn this as a background task with `tokio::spawn(worker.run())`
pub fn create_tagging_pipeline(
    tagger: Arc<dyn MetadataTagger>,
    mover: Arc<dyn ArchiveMover>,
    destination_dir: impl Into<PathBuf>,
) -> (TaggingHandle, TaggingWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = TaggingHandle::new(tx);
    let worker = TaggingWorker::new(rx, tagger, mover, destination_dir.into());
    (handle, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FsArchiveMover;
    use crate::testing::MockTagger;
    use tempfile::TempDir;

    fn metadata() -> MetaData {
        MetaData {
            film: "Tri-X 400".to_string(),
            exposure_number: Some(12),
            ..Default::default()
        }
    }

    async fn downloaded(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, b"jpeg").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_worker_tags_then_archives() {
        let incoming = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        let tagger = Arc::new(MockTagger::new());
        let (handle, worker) = create_tagging_pipeline(
            tagger.clone(),
            Arc::new(FsArchiveMover::new()),
            archive.path(),
        );
        let task = tokio::spawn(worker.run());

        let file = downloaded(&incoming, "IMG_0012.JPG").await;
        assert!(handle.enqueue(file.clone(), Some(metadata())));
        drop(handle);
        task.await.unwrap();

        let tagged = tagger.tagged().await;
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].0, file);
        assert_eq!(tagged[0].1.exposure_number, Some(12));
        assert!(archive.path().join("IMG_0012.JPG").exists());
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_no_metadata_skips_tagging() {
        let incoming = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        let tagger = Arc::new(MockTagger::new());
        let (_, worker) = create_tagging_pipeline(
            tagger.clone(),
            Arc::new(FsArchiveMover::new()),
            archive.path(),
        );

        let file = downloaded(&incoming, "IMG_0001.JPG").await;
        let job = TaggingJob {
            file,
            metadata: None,
            queued_at: Utc::now(),
        };
        let moved = worker.process(job).await.unwrap();
        assert_eq!(moved, archive.path().join("IMG_0001.JPG"));
        assert!(tagger.tagged().await.is_empty());
    }

    #[tokio::test]
    async fn test_tag_failure_still_archives() {
        let incoming = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        let tagger = Arc::new(MockTagger::new());
        tagger.set_should_fail(true).await;
        let (_, worker) = create_tagging_pipeline(
            tagger.clone(),
            Arc::new(FsArchiveMover::new()),
            archive.path(),
        );

        let file = downloaded(&incoming, "IMG_0002.JPG").await;
        let job = TaggingJob {
            file,
            metadata: Some(metadata()),
            queued_at: Utc::now(),
        };
        assert!(worker.process(job).await.is_ok());
        assert!(archive.path().join("IMG_0002.JPG").exists());
    }

    #[tokio::test]
    async fn test_move_failure_keeps_worker_running() {
        let incoming = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        let (handle, worker) = create_tagging_pipeline(
            Arc::new(MockTagger::new()),
            Arc::new(FsArchiveMover::new()),
            archive.path(),
        );
        let task = tokio::spawn(worker.run());

        handle.enqueue(incoming.path().join("missing.JPG"), None);
        let file = downloaded(&incoming, "IMG_0003.JPG").await;
        handle.enqueue(file, None);
        drop(handle);
        task.await.unwrap();

        assert!(archive.path().join("IMG_0003.JPG").exists());
    }

    #[test]
    fn test_enqueue_after_worker_dropped() {
        let (handle, worker) = create_tagging_pipeline(
            Arc::new(MockTagger::new()),
            Arc::new(FsArchiveMover::new()),
            "/tmp/archive",
        );
        drop(worker);
        assert!(!handle.enqueue(PathBuf::from("/tmp/IMG_0001.JPG"), None));
    }
}
