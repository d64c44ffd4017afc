use std::sync::Arc;

use gpumon::core::process_control::CriticalProcessGuard;
use gpumon::core::process_monitor::types::{
    GpuProcessType, ProcessFilter, ProcessQuery, ProcessSort, SortField, SortOrder,
};
use gpumon::core::process_monitor::MonitorRuntime;
use gpumon::MonitorConfig;

use super::common::{proc, RecordingActions, ScriptedProvider};

async fn service_with_population() -> (MonitorRuntime, gpumon::GpuProcessService) {
    let mut low = proc(10, 2.0);
    low.process_type = GpuProcessType::Graphics;
    let provider = ScriptedProvider::new(vec![Ok(vec![
        low,
        proc(20, 45.0),
        proc(30, 90.0),
        proc(40, 15.0),
    ])]);

    let runtime = MonitorRuntime::with_collaborators(
        &MonitorConfig {
            poll_interval_ms: 50,
            batch_window_ms: 20,
            ..Default::default()
        },
        Box::new(provider),
        RecordingActions::new(),
        Arc::new(CriticalProcessGuard::for_current_platform()),
    );
    let service = runtime.service();
    let mut batches = service.subscribe_batches();
    runtime.start().unwrap();
    batches.recv().await.unwrap();
    (runtime, service)
}

#[tokio::test(start_paused = true)]
async fn test_filtered_query_with_paging() {
    let (runtime, service) = service_with_population().await;

    let result = service.get_processes_filtered(&ProcessQuery {
        filter: Some(ProcessFilter {
            usage_threshold: 10.0,
            ..Default::default()
        }),
        sort: Some(ProcessSort {
            field: SortField::Usage,
            order: SortOrder::Desc,
        }),
        max_items: Some(2),
        offset: 0,
    });

    assert_eq!(result.total_count, 4);
    assert_eq!(result.filtered_count, 3);
    assert!(result.has_more);
    let pids: Vec<i32> = result.processes.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![30, 20]);

    let next_page = service.get_processes_filtered(&ProcessQuery {
        filter: Some(ProcessFilter {
            usage_threshold: 10.0,
            ..Default::default()
        }),
        sort: Some(ProcessSort {
            field: SortField::Usage,
            order: SortOrder::Desc,
        }),
        max_items: Some(2),
        offset: 2,
    });
    assert_eq!(next_page.processes.len(), 1);
    assert_eq!(next_page.processes[0].pid, 40);
    assert!(!next_page.has_more);

    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_type_filter() {
    let (runtime, service) = service_with_population().await;

    let result = service.get_processes_filtered(&ProcessQuery {
        filter: Some(ProcessFilter {
            filter_type: Some(GpuProcessType::Graphics),
            ..Default::default()
        }),
        ..Default::default()
    });

    assert_eq!(result.filtered_count, 1);
    assert_eq!(result.processes[0].pid, 10);

    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_validate_process() {
    let (runtime, service) = service_with_population().await;

    let valid = service.validate_process(42);
    assert!(valid.is_valid);
    assert_eq!(valid.process_name.as_deref(), Some("proc-42"));

    let invalid = service.validate_process(-1);
    assert!(!invalid.is_valid);
    assert_eq!(invalid.message, "invalid PID");

    let missing = service.validate_process(99999);
    assert!(!missing.is_valid);
    assert_eq!(missing.message, "process not found");

    runtime.shutdown();
}
