//! Validated, guarded process-control execution.
//!
//! All failures come back as `ControlResult { success: false }` data, never
//! as errors; validation and protection checks run before any OS call.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::process_monitor::types::{
    BatchControlOutcome, ControlOperation, ControlResult, ProcessPriority,
};
use crate::error::MonitorError;
use crate::platform::actions::ProcessActions;

use super::guard::CriticalProcessGuard;

/// Pause between operations in a batch so the OS scheduler is not slammed
const BATCH_OPERATION_DELAY: Duration = Duration::from_millis(100);

/// Executes control operations with validation, a critical-process guard,
/// and an at-most-one-in-flight guarantee per pid.
pub struct ProcessControlExecutor {
    actions: Arc<dyn ProcessActions>,
    guard: Arc<CriticalProcessGuard>,
    in_progress: Mutex<HashSet<i32>>,
}

/// Operation with its priority argument already validated
#[derive(Clone, Copy)]
enum ResolvedAction {
    Kill,
    Suspend,
    Resume,
    Priority(ProcessPriority),
}

/// Removes the pid from the in-progress set on every exit path
struct InFlight<'a> {
    set: &'a Mutex<HashSet<i32>>,
    pid: i32,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.pid);
    }
}

impl ProcessControlExecutor {
    pub fn new(actions: Arc<dyn ProcessActions>, guard: Arc<CriticalProcessGuard>) -> Self {
        Self {
            actions,
            guard,
            in_progress: Mutex::new(HashSet::new()),
        }
    }

    /// Run one control operation against a pid.
    ///
    /// Validation order: pid, priority string (priority ops only),
    /// concurrent-operation conflict, critical-process protection. Only
    /// after all four pass does the OS action run.
    pub fn execute(
        &self,
        pid: i32,
        operation: ControlOperation,
        priority: Option<&str>,
    ) -> ControlResult {
        if pid <= 0 {
            return ControlResult::fail(pid, operation, "invalid PID");
        }

        let action = match operation {
            ControlOperation::Kill => ResolvedAction::Kill,
            ControlOperation::Suspend => ResolvedAction::Suspend,
            ControlOperation::Resume => ResolvedAction::Resume,
            ControlOperation::Priority => match priority.map(ProcessPriority::from_str) {
                Some(Ok(level)) => ResolvedAction::Priority(level),
                _ => {
                    return ControlResult::fail(pid, operation, "invalid priority level");
                }
            },
        };

        let _in_flight = {
            let mut set = self.in_progress.lock();
            if !set.insert(pid) {
                return ControlResult::fail(pid, operation, "operation already in progress");
            }
            InFlight {
                set: &self.in_progress,
                pid,
            }
        };

        if let Some(name) = self.actions.process_name(pid) {
            if self.guard.is_critical(&name) {
                log::warn!(
                    "refused {} on critical system process {} ({})",
                    operation,
                    pid,
                    name
                );
                return ControlResult::fail(
                    pid,
                    operation,
                    "cannot control critical system process",
                );
            }
        }

        let outcome = match action {
            ResolvedAction::Kill => self.actions.kill(pid),
            ResolvedAction::Suspend => self.actions.suspend(pid),
            ResolvedAction::Resume => self.actions.resume(pid),
            ResolvedAction::Priority(level) => self.actions.set_priority(pid, level),
        };

        match outcome {
            Ok(()) => {
                log::info!("{} succeeded for PID {}", operation, pid);
                let result = ControlResult::ok(pid, operation, success_message(operation));
                match action {
                    ResolvedAction::Priority(level) => result.with_priority(level),
                    _ => result,
                }
            }
            Err(e) => {
                log::warn!("{} failed for PID {}: {}", operation, pid, e);
                let message = match &e {
                    MonitorError::PermissionDenied(msg) => format!("permission denied: {}", msg),
                    other => other.to_string(),
                };
                ControlResult::fail(pid, operation, message)
            }
        }
    }

    /// Run the same operation over a list of pids, sequentially, with a
    /// short pause between operations.
    pub async fn batch_execute(
        &self,
        pids: &[i32],
        operation: ControlOperation,
        priority: Option<&str>,
    ) -> BatchControlOutcome {
        let mut results = Vec::with_capacity(pids.len());

        for (i, &pid) in pids.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(BATCH_OPERATION_DELAY).await;
            }
            results.push(self.execute(pid, operation, priority));
        }

        let success_count = results.iter().filter(|r| r.success).count();
        BatchControlOutcome {
            failed_count: results.len() - success_count,
            success_count,
            results,
        }
    }

    /// True while an operation for this pid is executing
    pub fn is_in_progress(&self, pid: i32) -> bool {
        self.in_progress.lock().contains(&pid)
    }
}

fn success_message(operation: ControlOperation) -> &'static str {
    match operation {
        ControlOperation::Kill => "process terminated",
        ControlOperation::Suspend => "process suspended",
        ControlOperation::Resume => "process resumed",
        ControlOperation::Priority => "process priority updated",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process_control::guard::{CriticalProcessEntry, ProtectionLevel};
    use crate::error::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    /// Records invocations; optionally blocks until released
    struct MockActions {
        calls: AtomicUsize,
        fail_with: Option<MonitorError>,
        block_on: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl MockActions {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
                block_on: Mutex::new(None),
            }
        }

        fn failing(error: MonitorError) -> Self {
            Self {
                fail_with: Some(error),
                ..Self::new()
            }
        }

        fn invoked(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(rx) = self.block_on.lock().take() {
                let _ = rx.recv();
            }
            match &self.fail_with {
                Some(MonitorError::PermissionDenied(msg)) => {
                    Err(MonitorError::permission_denied(msg.clone()))
                }
                Some(e) => Err(MonitorError::process_control(e.to_string())),
                None => Ok(()),
            }
        }
    }

    impl ProcessActions for MockActions {
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
                _ => Some(format!("proc-{}", pid)),
            }
        }
    }

    fn executor_with(actions: Arc<MockActions>) -> ProcessControlExecutor {
        let guard = CriticalProcessGuard::with_entries(vec![CriticalProcessEntry {
            pattern: "systemd".to_string(),
            level: ProtectionLevel::Critical,
        }]);
        ProcessControlExecutor::new(actions, Arc::new(guard))
    }

    #[test]
    fn test_invalid_pid_fails_fast() {
        let actions = Arc::new(MockActions::new());
        let executor = executor_with(actions.clone());

        let result = executor.execute(-5, ControlOperation::Kill, None);
        assert!(!result.success);
        assert_eq!(result.message, "invalid PID");
        assert_eq!(result.pid, -5);
        assert_eq!(actions.invoked(), 0);
    }

    #[test]
    fn test_invalid_priority_fails_fast() {
        let actions = Arc::new(MockActions::new());
        let executor = executor_with(actions.clone());

        let result = executor.execute(42, ControlOperation::Priority, Some("urgent"));
        assert!(!result.success);
        assert_eq!(result.message, "invalid priority level");
        assert_eq!(actions.invoked(), 0);

        // Missing priority string is just as invalid
        let result = executor.execute(42, ControlOperation::Priority, None);
        assert!(!result.success);
        assert_eq!(actions.invoked(), 0);
    }

    #[test]
    fn test_priority_is_case_insensitive_and_echoed() {
        let actions = Arc::new(MockActions::new());
        let executor = executor_with(actions.clone());

        let result = executor.execute(42, ControlOperation::Priority, Some("Above_Normal"));
        assert!(result.success);
        assert_eq!(result.priority.as_deref(), Some("above_normal"));
        assert_eq!(actions.invoked(), 1);
    }

    #[test]
    fn test_critical_process_rejected_for_every_operation() {
        let actions = Arc::new(MockActions::new());
        let executor = executor_with(actions.clone());

        for (op, priority) in [
            (ControlOperation::Kill, None),
            (ControlOperation::Suspend, None),
            (ControlOperation::Resume, None),
            (ControlOperation::Priority, Some("low")),
        ] {
            let result = executor.execute(1, op, priority);
            assert!(!result.success);
            assert_eq!(result.message, "cannot control critical system process");
        }
        assert_eq!(actions.invoked(), 0);
    }

    #[test]
    fn test_at_most_one_in_flight_per_pid() {
        let mut actions = MockActions::new();
        let (release_tx, release_rx) = mpsc::channel();
        *actions.block_on.lock() = Some(release_rx);
        let actions = Arc::new(actions);
        let executor = Arc::new(executor_with(actions.clone()));

        let first = {
            let executor = Arc::clone(&executor);
            std::thread::spawn(move || executor.execute(42, ControlOperation::Kill, None))
        };

        // Wait until the first call is inside the OS action
        while actions.invoked() == 0 {
            std::thread::yield_now();
        }
        assert!(executor.is_in_progress(42));

        let second = executor.execute(42, ControlOperation::Suspend, None);
        assert!(!second.success);
        assert_eq!(second.message, "operation already in progress");

        release_tx.send(()).unwrap();
        let first = first.join().unwrap();
        assert!(first.success);

        // Cleanup ran; the pid can be controlled again
        assert!(!executor.is_in_progress(42));
        assert!(executor.execute(42, ControlOperation::Kill, None).success);
    }

    #[test]
    fn test_in_progress_cleared_after_os_failure() {
        let actions = Arc::new(MockActions::failing(MonitorError::process_control(
            "process 42 not found",
        )));
        let executor = executor_with(actions.clone());

        let result = executor.execute(42, ControlOperation::Kill, None);
        assert!(!result.success);
        assert!(result.message.contains("not found"));
        assert!(!executor.is_in_progress(42));
    }

    #[test]
    fn test_permission_denied_is_distinguishable() {
        let actions = Arc::new(MockActions::failing(MonitorError::permission_denied(
            "kill of PID 42 requires elevated privileges",
        )));
        let executor = executor_with(actions);

        let result = executor.execute(42, ControlOperation::Kill, None);
        assert!(!result.success);
        assert!(result.message.starts_with("permission denied"));
    }

    #[tokio::test]
    async fn test_batch_execute_accumulates_results() {
        let actions = Arc::new(MockActions::new());
        let executor = executor_with(actions.clone());

        let outcome = executor
            .batch_execute(&[42, -1, 1, 43], ControlOperation::Kill, None)
            .await;

        assert_eq!(outcome.results.len(), 4);
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.failed_count, 2);
        // Only the two permitted pids reached the OS
        assert_eq!(actions.invoked(), 2);
    }
}
