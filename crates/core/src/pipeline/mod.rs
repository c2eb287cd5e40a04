//! Post-capture processing: metadata tagging and archiving.
//!
//! Downloaded files are queued on a [`TaggingHandle`]; a single
//! [`TaggingWorker`] tags each one and moves it to the archive, in order.

mod error;
mod fs_mover;
mod metadata;
mod queue;
mod traits;

pub use error::PipelineError;
pub use fs_mover::FsArchiveMover;
pub use metadata::MetaData;
pub use queue::{create_tagging_pipeline, TaggingHandle, TaggingJob, TaggingWorker};
pub use traits::{ArchiveMover, MetadataTagger};
