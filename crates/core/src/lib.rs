pub mod capture;
pub mod config;
pub mod detector;
pub mod events;
pub mod hardware;
pub mod metrics;
pub mod pipeline;
pub mod scan;
pub mod session;
pub mod testing;

pub use capture::{CaptureCoordinator, CaptureError, FileCallback, SettingsSnapshot};
pub use config::{
    load_config, load_config_from_str, validate_config, CaptureConfig, ConfigError,
    DetectionStrategy, EventsConfig, IlluminanceConfig, ScanConfig, ScannerConfig,
    StorageConfig, VisionConfig,
};
pub use detector::FrameDetector;
pub use events::{BroadcastEventSink, EventEnvelope, EventSink, SessionEvent, SESSION_TOPIC};
pub use hardware::{
    CameraDevice, HardwareError, Lamp, LightSensor, MotorDriver, PreviewSource, VisionSensor,
};
pub use pipeline::{
    create_tagging_pipeline, ArchiveMover, FsArchiveMover, MetaData, MetadataTagger,
    PipelineError, TaggingHandle, TaggingWorker,
};
pub use scan::{
    CancelFlag, PhotoInfo, ScanController, ScanError, ScanLoop, ScanMode, ScanRig, ScanSignal,
    SessionState,
};
pub use session::{
    FrameCounter, Session, SessionDeps, SessionError, SessionManager, SessionSettings,
};
