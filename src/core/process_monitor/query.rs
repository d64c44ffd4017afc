//! Filter, sort, and paging evaluation for process listings.

use std::cmp::Ordering;

use super::types::{
    FilteredProcesses, GpuProcess, ProcessQuery, SortField, SortOrder,
};

/// Evaluate a query against a full process list.
///
/// `total_count` is the unfiltered population, `filtered_count` the size
/// after filtering but before paging.
pub fn evaluate(processes: Vec<GpuProcess>, query: &ProcessQuery, query_time_ms: f64) -> FilteredProcesses {
    let total_count = processes.len();

    let mut matched: Vec<GpuProcess> = processes
        .into_iter()
        .filter(|proc| matches_filter(proc, query))
        .collect();

    if let Some(sort) = &query.sort {
        sort_processes(&mut matched, sort.field, sort.order);
    }

    let filtered_count = matched.len();
    let offset = query.offset.min(filtered_count);
    let remaining = filtered_count - offset;
    let take = query.max_items.unwrap_or(remaining).min(remaining);

    let processes: Vec<GpuProcess> = matched.into_iter().skip(offset).take(take).collect();
    let has_more = offset + processes.len() < filtered_count;

    FilteredProcesses {
        processes,
        total_count,
        filtered_count,
        has_more,
        query_time_ms,
    }
}

fn matches_filter(proc: &GpuProcess, query: &ProcessQuery) -> bool {
    let filter = match &query.filter {
        Some(f) if f.enabled => f,
        _ => return true,
    };

    if proc.gpu_usage_percent < filter.usage_threshold {
        return false;
    }
    if proc.gpu_memory_mb < filter.memory_threshold {
        return false;
    }
    if let Some(wanted) = filter.filter_type {
        if proc.process_type != wanted {
            return false;
        }
    }
    true
}

fn sort_processes(processes: &mut [GpuProcess], field: SortField, order: SortOrder) {
    processes.sort_by(|a, b| {
        let ordering = match field {
            SortField::Usage => a
                .gpu_usage_percent
                .partial_cmp(&b.gpu_usage_percent)
                .unwrap_or(Ordering::Equal),
            SortField::Memory => a
                .gpu_memory_mb
                .partial_cmp(&b.gpu_memory_mb)
                .unwrap_or(Ordering::Equal),
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Pid => a.pid.cmp(&b.pid),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}
