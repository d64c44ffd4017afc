use std::sync::Arc;

use gpumon::core::process_control::{
    CriticalProcessEntry, CriticalProcessGuard, ProcessControlExecutor, ProtectionLevel,
};
use gpumon::core::process_monitor::types::ControlOperation;

use super::common::RecordingActions;

fn executor(actions: Arc<RecordingActions>) -> ProcessControlExecutor {
    let guard = CriticalProcessGuard::with_entries(vec![CriticalProcessEntry {
        pattern: "systemd".to_string(),
        level: ProtectionLevel::Critical,
    }]);
    ProcessControlExecutor::new(actions, Arc::new(guard))
}

#[test]
fn test_invalid_pid_shape_matches_contract() {
    let actions = RecordingActions::new();
    let executor = executor(actions.clone());

    let result = executor.execute(-5, ControlOperation::Kill, None);
    assert!(!result.success);
    assert_eq!(result.message, "invalid PID");
    assert_eq!(result.pid, -5);
    assert_eq!(result.operation, ControlOperation::Kill);
    assert!(result.priority.is_none());
    assert_eq!(actions.invoked(), 0);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["operation"], "kill");
    assert_eq!(json["success"], false);
    assert!(json.get("priority").is_none());
}

#[test]
fn test_critical_process_never_reaches_os() {
    let actions = RecordingActions::new();
    let executor = executor(actions.clone());

    for (op, priority) in [
        (ControlOperation::Kill, None),
        (ControlOperation::Suspend, None),
        (ControlOperation::Resume, None),
        (ControlOperation::Priority, Some("high")),
    ] {
        let result = executor.execute(1, op, priority);
        assert!(!result.success);
        assert_eq!(result.message, "cannot control critical system process");
    }
    assert_eq!(actions.invoked(), 0);
}

#[test]
fn test_permitted_operations_reach_os() {
    let actions = RecordingActions::new();
    let executor = executor(actions.clone());

    assert!(executor.execute(42, ControlOperation::Kill, None).success);
    assert!(executor.execute(42, ControlOperation::Suspend, None).success);
    assert!(executor.execute(42, ControlOperation::Resume, None).success);

    let result = executor.execute(42, ControlOperation::Priority, Some("REALTIME"));
    assert!(result.success);
    assert_eq!(result.priority.as_deref(), Some("realtime"));

    assert_eq!(actions.invoked(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_batch_operation_summary() {
    let actions = RecordingActions::new();
    let executor = executor(actions.clone());

    // 42 and 43 succeed, -1 fails validation, 1 is protected
    let outcome = executor
        .batch_execute(&[42, -1, 1, 43], ControlOperation::Kill, None)
        .await;

    assert_eq!(outcome.results.len(), 4);
    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.failed_count, 2);
    assert_eq!(actions.invoked(), 2);

    let messages: Vec<&str> = outcome
        .results
        .iter()
        .map(|r| r.message.as_str())
        .collect();
    assert!(messages.contains(&"invalid PID"));
    assert!(messages.contains(&"cannot control critical system process"));
}
