use std::io;
use thiserror::Error;

/// Custom error type for the gpumon core
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),

    #[error("Process snapshot failed: {0}")]
    SnapshotCollection(String),

    #[error("Unknown polling job: {0}")]
    UnknownJob(String),

    #[error("Process control failed: {0}")]
    ProcessControl(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the gpumon core
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        MonitorError::PermissionDenied(msg.into())
    }

    pub fn gpu_not_available<S: Into<String>>(msg: S) -> Self {
        MonitorError::GpuNotAvailable(msg.into())
    }

    pub fn snapshot_collection<S: Into<String>>(msg: S) -> Self {
        MonitorError::SnapshotCollection(msg.into())
    }

    pub fn process_control<S: Into<String>>(msg: S) -> Self {
        MonitorError::ProcessControl(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        MonitorError::Other(msg.into())
    }
}
