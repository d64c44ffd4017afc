use std::sync::Arc;
use std::time::Duration;

use gpumon::core::process_control::CriticalProcessGuard;
use gpumon::core::process_monitor::{MonitorRuntime, GPU_PROCESS_JOB};
use gpumon::MonitorConfig;

use super::common::{proc, RecordingActions, ScriptedProvider};

fn fast_config() -> MonitorConfig {
    MonitorConfig {
        poll_interval_ms: 100,
        batch_window_ms: 50,
        ..Default::default()
    }
}

fn runtime_with(provider: ScriptedProvider) -> MonitorRuntime {
    MonitorRuntime::with_collaborators(
        &fast_config(),
        Box::new(provider),
        RecordingActions::new(),
        Arc::new(CriticalProcessGuard::for_current_platform()),
    )
}

#[tokio::test(start_paused = true)]
async fn test_poll_delta_batch_pipeline() {
    let provider = ScriptedProvider::new(vec![
        Ok(vec![proc(100, 10.0)]),
        Ok(vec![proc(100, 10.0), proc(200, 5.0)]),
    ]);
    let runtime = runtime_with(provider);
    let service = runtime.service();
    let mut batches = service.subscribe_batches();

    runtime.start().unwrap();

    // First poll discovers pid 100
    let batch = batches.recv().await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].pid, 100);

    // Second poll adds pid 200; only the new process is transmitted
    let batch = batches.recv().await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].pid, 200);

    let processes = service.get_processes();
    assert_eq!(processes.len(), 2);

    // A client at update 1 gets exactly the addition of pid 200
    let response = service.get_processes_delta(1);
    assert!(!response.full_refresh);
    let delta = response.delta.unwrap();
    assert_eq!(delta.added.iter().map(|p| p.pid).collect::<Vec<_>>(), [200]);
    assert!(delta.updated.is_empty());
    assert!(delta.removed.is_empty());

    // A current client gets nothing
    let response = service.get_processes_delta(delta.update_id);
    assert!(response.delta.is_none());
    assert!(!response.full_refresh);

    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_stale_client_gets_full_refresh() {
    let provider = ScriptedProvider::new(vec![Ok(vec![proc(100, 10.0), proc(200, 5.0)])]);
    let runtime = runtime_with(provider);
    let service = runtime.service();
    let mut batches = service.subscribe_batches();

    runtime.start().unwrap();
    batches.recv().await.unwrap();

    let response = service.get_processes_delta(987654);
    assert!(response.full_refresh);
    assert_eq!(response.total_count, 2);
    let delta = response.delta.unwrap();
    assert_eq!(delta.added.len(), 2);
    assert!(delta.removed.is_empty());

    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_failed_poll_retains_previous_snapshot() {
    let provider = ScriptedProvider::new(vec![
        Ok(vec![proc(100, 10.0)]),
        Err(gpumon::MonitorError::snapshot_collection("driver hiccup")),
        Err(gpumon::MonitorError::snapshot_collection("driver hiccup")),
    ]);
    let runtime = runtime_with(provider);
    let service = runtime.service();
    let mut batches = service.subscribe_batches();

    runtime.start().unwrap();
    batches.recv().await.unwrap();
    let update_id_after_first = service.get_processes_delta(0).delta.unwrap().update_id;

    // Ride through the two failed polls
    tokio::time::sleep(Duration::from_millis(400)).await;
    tokio::task::yield_now().await;

    // Snapshot unchanged, no spurious "all removed"
    let processes = service.get_processes();
    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0].pid, 100);
    assert_eq!(
        service.get_processes_delta(update_id_after_first).delta.map(|d| d.update_id),
        None
    );

    // Errors were counted for adaptation
    let perf = runtime.scheduler().performance(GPU_PROCESS_JOB).unwrap();
    assert!(perf.error_rate() > 0.0);

    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_set_monitoring_pauses_and_resumes_polling() {
    let provider = ScriptedProvider::new(vec![
        Ok(vec![proc(1000, 1.0)]),
        Ok(vec![proc(1000, 1.0), proc(1001, 1.0)]),
        Ok(vec![proc(1000, 1.0), proc(1001, 1.0), proc(1002, 1.0)]),
    ]);
    let runtime = runtime_with(provider);
    let service = runtime.service();
    let mut batches = service.subscribe_batches();

    runtime.start().unwrap();
    assert!(service.is_monitoring());
    batches.recv().await.unwrap();

    service.set_monitoring(false).unwrap();
    assert!(!service.is_monitoring());
    let frozen_count = service.get_processes().len();

    tokio::time::sleep(Duration::from_millis(500)).await;
    tokio::task::yield_now().await;
    assert_eq!(service.get_processes().len(), frozen_count);

    service.set_monitoring(true).unwrap();
    assert!(service.is_monitoring());
    batches.recv().await.unwrap();
    assert!(service.get_processes().len() > frozen_count);

    runtime.shutdown();
}
