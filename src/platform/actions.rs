//! OS-level process actions behind a mockable trait.
//!
//! The executor talks to this trait only; the real implementation sends
//! Unix signals via nix and maps the six priority levels to nice values.

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::core::process_monitor::types::ProcessPriority;
use crate::error::{MonitorError, Result};

/// The side-effecting operations the control executor can perform
pub trait ProcessActions: Send + Sync {
    fn kill(&self, pid: i32) -> Result<()>;
    fn suspend(&self, pid: i32) -> Result<()>;
    fn resume(&self, pid: i32) -> Result<()>;
    fn set_priority(&self, pid: i32, priority: ProcessPriority) -> Result<()>;

    /// Name of the process, if it currently exists
    fn process_name(&self, pid: i32) -> Option<String>;
}

/// Real implementation backed by signals / setpriority and sysinfo lookups
pub struct SystemProcessActions {
    system: Mutex<System>,
}

impl SystemProcessActions {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemProcessActions {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessActions for SystemProcessActions {
    #[cfg(unix)]
    fn kill(&self, pid: i32) -> Result<()> {
        send_signal(pid, nix::sys::signal::Signal::SIGKILL, "terminate")
    }

    #[cfg(not(unix))]
    fn kill(&self, pid: i32) -> Result<()> {
        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid as u32)]), true);
        match system.process(Pid::from_u32(pid as u32)) {
            Some(process) if process.kill() => Ok(()),
            Some(_) => Err(MonitorError::process_control(format!(
                "failed to terminate PID {}",
                pid
            ))),
            None => Err(MonitorError::process_control(format!(
                "process {} not found",
                pid
            ))),
        }
    }

    #[cfg(unix)]
    fn suspend(&self, pid: i32) -> Result<()> {
        send_signal(pid, nix::sys::signal::Signal::SIGSTOP, "suspend")
    }

    #[cfg(not(unix))]
    fn suspend(&self, _pid: i32) -> Result<()> {
        Err(MonitorError::process_control(
            "suspend is not supported on this platform",
        ))
    }

    #[cfg(unix)]
    fn resume(&self, pid: i32) -> Result<()> {
        send_signal(pid, nix::sys::signal::Signal::SIGCONT, "resume")
    }

    #[cfg(not(unix))]
    fn resume(&self, _pid: i32) -> Result<()> {
        Err(MonitorError::process_control(
            "resume is not supported on this platform",
        ))
    }

    #[cfg(unix)]
    fn set_priority(&self, pid: i32, priority: ProcessPriority) -> Result<()> {
        let nice = nice_value(priority);
        let res = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, nice) };
        if res == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) || err.raw_os_error() == Some(libc::EACCES) {
            Err(MonitorError::permission_denied(format!(
                "setting priority for PID {} requires elevated privileges",
                pid
            )))
        } else {
            Err(MonitorError::process_control(format!(
                "failed to set nice value for PID {}: {}",
                pid, err
            )))
        }
    }

    #[cfg(not(unix))]
    fn set_priority(&self, _pid: i32, _priority: ProcessPriority) -> Result<()> {
        Err(MonitorError::process_control(
            "priority changes are not supported on this platform",
        ))
    }

    fn process_name(&self, pid: i32) -> Option<String> {
        let mut system = self.system.lock();
        let pid = Pid::from_u32(pid as u32);
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system
            .process(pid)
            .map(|p| p.name().to_string_lossy().to_string())
    }
}

#[cfg(unix)]
fn send_signal(pid: i32, signal: nix::sys::signal::Signal, verb: &str) -> Result<()> {
    use nix::errno::Errno;

    let nix_pid = nix::unistd::Pid::from_raw(pid);
    match nix::sys::signal::kill(nix_pid, signal) {
        Ok(()) => Ok(()),
        Err(Errno::EPERM) => Err(MonitorError::permission_denied(format!(
            "{} of PID {} requires elevated privileges",
            verb, pid
        ))),
        Err(Errno::ESRCH) => Err(MonitorError::process_control(format!(
            "process {} not found",
            pid
        ))),
        Err(e) => Err(MonitorError::process_control(format!(
            "failed to {} PID {}: {}",
            verb, pid, e
        ))),
    }
}

/// Map the six-level contract to Unix nice values
#[cfg(unix)]
fn nice_value(priority: ProcessPriority) -> i32 {
    match priority {
        ProcessPriority::Low => 19,
        ProcessPriority::BelowNormal => 10,
        ProcessPriority::Normal => 0,
        ProcessPriority::AboveNormal => -5,
        ProcessPriority::High => -10,
        ProcessPriority::Realtime => -20,
    }
}
