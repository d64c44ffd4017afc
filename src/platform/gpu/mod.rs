//! GPU-specific platform code.
//!
//! Enumerates GPU-consuming processes per vendor. NVIDIA is supported via
//! NVML; other vendors can be added behind the same trait.

#[cfg(feature = "nvml")]
mod nvidia;

#[cfg(feature = "nvml")]
pub use nvidia::NvidiaProcessProvider;

use crate::core::process_monitor::types::GpuProcess;
use crate::error::{MonitorError, Result};

/// Source of "which processes are using the GPU right now"
pub trait GpuProcessProvider: Send {
    /// Enumerate GPU-consuming processes with usage, memory, type, and
    /// command/status enrichment
    fn snapshot(&mut self) -> Result<Vec<GpuProcess>>;

    /// Check if the provider is functional
    fn is_available(&self) -> bool;
}

/// Attempt to get an available GPU process provider.
///
/// Returns an error when no supported GPU is present.
pub fn get_gpu_process_provider() -> Result<Box<dyn GpuProcessProvider>> {
    #[cfg(feature = "nvml")]
    {
        if let Ok(provider) = NvidiaProcessProvider::new() {
            return Ok(Box::new(provider));
        }
    }

    Err(MonitorError::gpu_not_available("No supported GPU found"))
}
