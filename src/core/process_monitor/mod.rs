//! GPU process monitoring core.
//!
//! This module provides the business logic for sampling GPU-consuming
//! processes, diffing consecutive snapshots, batching updates, and serving
//! the in-process API consumed by the UI layer.

pub mod batch;
mod delta;
mod performance;
pub mod query;
mod runtime;
mod scheduler;
mod service;
mod store;
pub mod types;

pub use batch::{BatchAggregator, DEFAULT_BATCH_WINDOW};
pub use delta::{compute_delta, full_refresh_delta};
pub use performance::PerformanceMonitor;
pub use runtime::{MonitorRuntime, GPU_PROCESS_JOB};
pub use scheduler::{PollFuture, PollScheduler, SchedulerConfig};
pub use service::GpuProcessService;
pub use store::{DeltaSince, SnapshotStore, DEFAULT_HISTORY_RETENTION};
pub use types::{
    BatchControlOutcome, ControlOperation, ControlResult, Delta, DeltaResponse,
    FilteredProcesses, GpuProcess, GpuProcessType, ProcessFilter, ProcessPriority,
    ProcessQuery, ProcessSort, ProcessStatus, ProcessValidation, Snapshot, SortField,
    SortOrder,
};
