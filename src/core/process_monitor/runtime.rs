//! Wiring for the monitoring core.
//!
//! Builds the store, batch aggregator, scheduler, guard, and executor as
//! explicitly constructed instances owned by one coordinator, and
//! registers the GPU polling job. There are no process-wide singletons;
//! consumers hold cloned service handles.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::config::MonitorConfig;
use crate::core::process_control::{CriticalProcessGuard, ProcessControlExecutor};
use crate::error::Result;
use crate::platform::actions::{ProcessActions, SystemProcessActions};
use crate::platform::gpu::{get_gpu_process_provider, GpuProcessProvider};

use super::batch::BatchAggregator;
use super::scheduler::{PollScheduler, SchedulerConfig};
use super::service::GpuProcessService;
use super::store::SnapshotStore;

/// Name of the polling job that samples GPU processes
pub const GPU_PROCESS_JOB: &str = "gpu-processes";

/// Owns the monitoring pipeline; constructed at startup, torn down at
/// shutdown.
pub struct MonitorRuntime {
    scheduler: Arc<PollScheduler>,
    service: GpuProcessService,
}

impl MonitorRuntime {
    /// Build the runtime with the platform GPU provider and real OS
    /// actions. Must be called from within a tokio runtime.
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        let provider = get_gpu_process_provider()?;
        Ok(Self::with_collaborators(
            config,
            provider,
            Arc::new(SystemProcessActions::new()),
            Arc::new(CriticalProcessGuard::for_current_platform()),
        ))
    }

    /// Build the runtime with injected collaborators (tests, embedders)
    pub fn with_collaborators(
        config: &MonitorConfig,
        provider: Box<dyn GpuProcessProvider>,
        actions: Arc<dyn ProcessActions>,
        guard: Arc<CriticalProcessGuard>,
    ) -> Self {
        let store = Arc::new(SnapshotStore::with_retention(config.history_retention));
        let batch = BatchAggregator::new(Duration::from_millis(config.batch_window_ms));
        let scheduler = Arc::new(PollScheduler::new(SchedulerConfig {
            background_factor: config.background_factor,
            error_rate_threshold: config.error_rate_threshold,
        }));
        let executor = Arc::new(ProcessControlExecutor::new(Arc::clone(&actions), guard));

        let provider = Arc::new(Mutex::new(provider));
        {
            let store = Arc::clone(&store);
            let batch = batch.clone();
            scheduler.register(
                GPU_PROCESS_JOB,
                Duration::from_millis(config.poll_interval_ms),
                move || {
                    let provider = Arc::clone(&provider);
                    let store = Arc::clone(&store);
                    let batch = batch.clone();
                    Box::pin(async move {
                        // On failure the error propagates to the scheduler's
                        // tick loop and the previous snapshot stays as-is
                        let processes = provider.lock().snapshot()?;
                        if let Some(delta) = store.apply(processes) {
                            log::debug!(
                                "snapshot {}: +{} ~{} -{}",
                                delta.update_id,
                                delta.added.len(),
                                delta.updated.len(),
                                delta.removed.len()
                            );
                            for record in delta.added.iter().chain(delta.updated.iter()) {
                                batch.add(record.clone());
                            }
                        }
                        Ok(())
                    })
                },
            );
        }

        let service = GpuProcessService::new(
            store,
            Arc::clone(&scheduler),
            executor,
            actions,
            batch,
        );

        Self { scheduler, service }
    }

    /// Start the GPU polling job
    pub fn start(&self) -> Result<()> {
        self.scheduler.start(GPU_PROCESS_JOB)
    }

    /// Handle for consumers; cheap to clone
    pub fn service(&self) -> GpuProcessService {
        self.service.clone()
    }

    /// Foreground/background signal from the host application
    pub fn set_visible(&self, visible: bool) {
        self.scheduler.set_visible(visible);
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Stop all polling jobs; in-flight polls finish and are discarded
    pub fn shutdown(&self) {
        self.scheduler.stop_all();
    }
}
