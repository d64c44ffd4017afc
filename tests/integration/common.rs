//! Shared test doubles for the integration suite.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use gpumon::core::process_monitor::types::{
    GpuProcess, GpuProcessType, ProcessPriority, ProcessStatus,
};
use gpumon::error::{MonitorError, Result};
use gpumon::platform::{GpuProcessProvider, ProcessActions};

pub fn proc(pid: i32, usage: f32) -> GpuProcess {
    GpuProcess {
        pid,
        name: format!("proc-{}", pid),
        gpu_usage_percent: usage,
        gpu_memory_mb: 256.0,
        process_type: GpuProcessType::Compute,
        command: format!("/usr/bin/proc-{}", pid),
        status: ProcessStatus::Running,
        priority: None,
    }
}

/// Plays back a scripted sequence of snapshots; repeats the last one when
/// the script runs out. `Err` entries simulate failed polls.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Vec<GpuProcess>>>>,
    last: Mutex<Vec<GpuProcess>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Vec<GpuProcess>>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(Vec::new()),
        }
    }
}

impl GpuProcessProvider for ScriptedProvider {
    fn snapshot(&mut self) -> Result<Vec<GpuProcess>> {
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(processes)) => {
                *self.last.lock() = processes.clone();
                Ok(processes)
            }
            Some(Err(e)) => Err(MonitorError::snapshot_collection(e.to_string())),
            None => Ok(self.last.lock().clone()),
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Counts OS action invocations; pid 1 reports itself as systemd so guard
/// paths can be exercised.
pub struct RecordingActions {
    pub calls: AtomicUsize,
}

impl RecordingActions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn invoked(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ProcessActions for RecordingActions {
    fn kill(&self, _pid: i32) -> Result<()> {
        self.record()
    }

    fn suspend(&self, _pid: i32) -> Result<()> {
        self.record()
    }

    fn resume(&self, _pid: i32) -> Result<()> {
        self.record()
    }

    fn set_priority(&self, _pid: i32, _priority: ProcessPriority) -> Result<()> {
        self.record()
    }

    fn process_name(&self, pid: i32) -> Option<String> {
        match pid {
            1 => Some("systemd".to_string()),
            99999 => None,
            _ => Some(format!("proc-{}", pid)),
        }
    }
}
