use thiserror::Error;

/// All errors produced by slicepipe-core.
///
/// Contention and a full/empty pipeline are not errors; those surface as
/// [`Progress::Idle`](crate::pipeline::Progress::Idle).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("channel length mismatch: left={left} right={right}")]
    ChannelLengthMismatch { left: usize, right: usize },

    #[error("frame length {actual} does not match pipeline size {expected}")]
    FrameLengthMismatch { expected: usize, actual: usize },

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,

    #[error("failed to spawn worker thread {name}: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
