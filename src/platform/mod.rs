// Platform-specific code module

pub mod actions;
pub mod gpu;

pub use actions::{ProcessActions, SystemProcessActions};
pub use gpu::{get_gpu_process_provider, GpuProcessProvider};
