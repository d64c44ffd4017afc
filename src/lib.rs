// gpumon library - Public API

// Re-export error types
pub mod error;
pub use error::{MonitorError, Result};

// Module declarations
pub mod core;
pub mod platform;

// Re-export commonly used types
pub use core::config::MonitorConfig;
pub use core::process_monitor::{GpuProcessService, MonitorRuntime};

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
