//! The in-process API surface consumed by the UI layer.
//!
//! Wire-shaped request/response types live in [`super::types`]; every
//! method here maps one-to-one onto a bridge call.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::core::process_control::ProcessControlExecutor;
use crate::platform::actions::ProcessActions;

use super::batch::BatchAggregator;
use super::delta::full_refresh_delta;
use super::query;
use super::runtime::GPU_PROCESS_JOB;
use super::scheduler::PollScheduler;
use super::store::{DeltaSince, SnapshotStore};
use super::types::{
    BatchControlOutcome, ControlOperation, ControlResult, DeltaResponse, FilteredProcesses,
    GpuProcess, ProcessQuery, ProcessValidation,
};
use crate::error::Result;

/// Handle onto the monitoring core; cheap to clone, safe to share
#[derive(Clone)]
pub struct GpuProcessService {
    store: Arc<SnapshotStore>,
    scheduler: Arc<PollScheduler>,
    executor: Arc<ProcessControlExecutor>,
    actions: Arc<dyn ProcessActions>,
    batch: BatchAggregator,
}

impl GpuProcessService {
    pub(super) fn new(
        store: Arc<SnapshotStore>,
        scheduler: Arc<PollScheduler>,
        executor: Arc<ProcessControlExecutor>,
        actions: Arc<dyn ProcessActions>,
        batch: BatchAggregator,
    ) -> Self {
        Self {
            store,
            scheduler,
            executor,
            actions,
            batch,
        }
    }

    /// Full current snapshot, no paging
    pub fn get_processes(&self) -> Vec<GpuProcess> {
        self.store.current().processes
    }

    /// Filtered, sorted, paged listing
    pub fn get_processes_filtered(&self, query: &ProcessQuery) -> FilteredProcesses {
        let started = Instant::now();
        let processes = self.store.current().processes;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        query::evaluate(processes, query, elapsed_ms)
    }

    /// Incremental changes since the client's last seen update id.
    ///
    /// A client whose id fell out of retained history gets the complete
    /// snapshot replayed as additions with `full_refresh` set.
    pub fn get_processes_delta(&self, last_update_id: u64) -> DeltaResponse {
        let started = Instant::now();

        let (delta, full_refresh) = match self.store.delta_since(last_update_id) {
            DeltaSince::UpToDate => (None, false),
            DeltaSince::Changes(delta) => (Some(delta), false),
            DeltaSince::Stale => {
                let current = self.store.current();
                (Some(full_refresh_delta(&current)), true)
            }
        };

        DeltaResponse {
            delta,
            full_refresh,
            total_count: self.store.process_count(),
            query_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    pub fn kill_process(&self, pid: i32) -> ControlResult {
        self.executor.execute(pid, ControlOperation::Kill, None)
    }

    pub fn suspend_process(&self, pid: i32) -> ControlResult {
        self.executor.execute(pid, ControlOperation::Suspend, None)
    }

    pub fn resume_process(&self, pid: i32) -> ControlResult {
        self.executor.execute(pid, ControlOperation::Resume, None)
    }

    pub fn set_process_priority(&self, pid: i32, priority: &str) -> ControlResult {
        self.executor
            .execute(pid, ControlOperation::Priority, Some(priority))
    }

    /// Same operation over many pids, sequential with pacing
    pub async fn batch_operation(
        &self,
        pids: &[i32],
        operation: ControlOperation,
        priority: Option<&str>,
    ) -> BatchControlOutcome {
        self.executor.batch_execute(pids, operation, priority).await
    }

    /// Check whether a pid exists and report its name
    pub fn validate_process(&self, pid: i32) -> ProcessValidation {
        if pid <= 0 {
            return ProcessValidation {
                pid,
                is_valid: false,
                message: "invalid PID".to_string(),
                process_name: None,
            };
        }

        match self.actions.process_name(pid) {
            Some(name) => ProcessValidation {
                pid,
                is_valid: true,
                message: "process exists".to_string(),
                process_name: Some(name),
            },
            None => ProcessValidation {
                pid,
                is_valid: false,
                message: "process not found".to_string(),
                process_name: None,
            },
        }
    }

    /// Pause or resume the GPU polling job without touching other jobs
    pub fn set_monitoring(&self, enabled: bool) -> Result<()> {
        if enabled {
            self.scheduler.start(GPU_PROCESS_JOB)
        } else {
            self.scheduler.stop(GPU_PROCESS_JOB)
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.scheduler.is_running(GPU_PROCESS_JOB)
    }

    /// Subscribe to deduplicated update batches
    pub fn subscribe_batches(&self) -> broadcast::Receiver<Vec<GpuProcess>> {
        self.batch.subscribe()
    }
}
