//! NVIDIA GPU process enumeration using NVML.

use std::collections::HashMap;

use nvml_wrapper::enums::device::UsedGpuMemory;
use nvml_wrapper::Nvml;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::core::process_monitor::types::{
    GpuProcess, GpuProcessType, ProcessPriority, ProcessStatus,
};
use crate::error::{MonitorError, Result};
use crate::platform::gpu::GpuProcessProvider;

/// Enumerates processes running on an NVIDIA device.
///
/// Compute and graphics process lists come from NVML; name, command, and
/// status are enriched from sysinfo per snapshot.
pub struct NvidiaProcessProvider {
    nvml: Nvml,
    device_index: u32,
    system: System,
    /// NVML only reports utilization samples newer than this
    last_util_timestamp: u64,
}

impl NvidiaProcessProvider {
    /// Initialize NVML and select the first available GPU
    pub fn new() -> Result<Self> {
        Self::with_device_index(0)
    }

    /// Create provider for a specific GPU index
    pub fn with_device_index(index: u32) -> Result<Self> {
        let nvml = Nvml::init()
            .map_err(|e| MonitorError::gpu_not_available(format!("Failed to init NVML: {}", e)))?;

        let _ = nvml.device_by_index(index).map_err(|e| {
            MonitorError::gpu_not_available(format!("GPU {} not found: {}", index, e))
        })?;

        Ok(Self {
            nvml,
            device_index: index,
            system: System::new(),
            last_util_timestamp: 0,
        })
    }
}

impl GpuProcessProvider for NvidiaProcessProvider {
    fn is_available(&self) -> bool {
        self.nvml.device_by_index(self.device_index).is_ok()
    }

    fn snapshot(&mut self) -> Result<Vec<GpuProcess>> {
        let device = self.nvml.device_by_index(self.device_index).map_err(|e| {
            MonitorError::snapshot_collection(format!("Failed to get GPU device: {}", e))
        })?;

        let compute = device.running_compute_processes().map_err(|e| {
            MonitorError::snapshot_collection(format!("Failed to list compute processes: {}", e))
        })?;
        let graphics = device.running_graphics_processes().map_err(|e| {
            MonitorError::snapshot_collection(format!("Failed to list graphics processes: {}", e))
        })?;

        // pid -> (memory bytes, type); a pid on both lists is Both
        let mut seen: HashMap<u32, (u64, GpuProcessType)> = HashMap::new();
        for info in &compute {
            seen.insert(info.pid, (used_bytes(&info.used_gpu_memory), GpuProcessType::Compute));
        }
        for info in &graphics {
            seen.entry(info.pid)
                .and_modify(|entry| entry.1 = GpuProcessType::Both)
                .or_insert((used_bytes(&info.used_gpu_memory), GpuProcessType::Graphics));
        }

        // Per-process SM utilization; unsupported on some boards, so a
        // failure just leaves usage at zero
        let mut utilization: HashMap<u32, u32> = HashMap::new();
        if let Ok(samples) = device.process_utilization_stats(self.last_util_timestamp) {
            for sample in samples {
                self.last_util_timestamp = self.last_util_timestamp.max(sample.timestamp);
                utilization.insert(sample.pid, sample.sm_util);
            }
        }

        let pids: Vec<Pid> = seen.keys().map(|&pid| Pid::from_u32(pid)).collect();
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&pids), true);

        let mut processes: Vec<GpuProcess> = seen
            .into_iter()
            .map(|(pid, (memory_bytes, process_type))| {
                let sys_proc = self.system.process(Pid::from_u32(pid));
                GpuProcess {
                    pid: pid as i32,
                    name: sys_proc
                        .map(|p| p.name().to_string_lossy().to_string())
                        .unwrap_or_default(),
                    gpu_usage_percent: utilization.get(&pid).copied().unwrap_or(0) as f32,
                    gpu_memory_mb: memory_bytes as f64 / (1024.0 * 1024.0),
                    process_type,
                    command: sys_proc
                        .map(|p| {
                            p.cmd()
                                .iter()
                                .map(|arg| arg.to_string_lossy())
                                .collect::<Vec<_>>()
                                .join(" ")
                        })
                        .unwrap_or_default(),
                    status: sys_proc
                        .map(|p| map_status(p.status()))
                        .unwrap_or(ProcessStatus::Terminated),
                    priority: sys_proc.and_then(|_| read_priority(pid as i32)),
                }
            })
            .collect();

        processes.sort_unstable_by_key(|p| p.pid);
        Ok(processes)
    }
}

fn used_bytes(memory: &UsedGpuMemory) -> u64 {
    match memory {
        UsedGpuMemory::Used(bytes) => *bytes,
        UsedGpuMemory::Unavailable => 0,
    }
}

fn map_status(status: sysinfo::ProcessStatus) -> ProcessStatus {
    match status {
        sysinfo::ProcessStatus::Stop => ProcessStatus::Suspended,
        sysinfo::ProcessStatus::Zombie | sysinfo::ProcessStatus::Dead => {
            ProcessStatus::Terminated
        }
        _ => ProcessStatus::Running,
    }
}

/// Current nice value mapped back onto the six-level contract
#[cfg(unix)]
fn read_priority(pid: i32) -> Option<ProcessPriority> {
    nix::errno::Errno::clear();
    let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid as libc::id_t) };
    // -1 is a valid nice value; errno disambiguates
    if nice == -1 && nix::errno::Errno::last_raw() != 0 {
        return None;
    }
    Some(match nice {
        i32::MIN..=-20 => ProcessPriority::Realtime,
        -19..=-10 => ProcessPriority::High,
        -9..=-1 => ProcessPriority::AboveNormal,
        0 => ProcessPriority::Normal,
        1..=10 => ProcessPriority::BelowNormal,
        _ => ProcessPriority::Low,
    })
}

#[cfg(not(unix))]
fn read_priority(_pid: i32) -> Option<ProcessPriority> {
    None
}
