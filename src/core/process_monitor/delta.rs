//! Snapshot diffing.
//!
//! Pure computation over two already-validated snapshots; performs no I/O.
//! Callers must skip diffing entirely on a failed poll so that an empty
//! current snapshot is never mistaken for "all processes removed".

use std::collections::HashMap;

use super::types::{Delta, GpuProcess, Snapshot};

/// Compare `current` against `previous` and partition current pids into
/// added/updated, with previous pids missing from current as removed.
///
/// Records whose observable fields are unchanged are dropped from the
/// delta; they carry no information worth transmitting.
pub fn compute_delta(previous: &Snapshot, current: &Snapshot, update_id: u64) -> Delta {
    let mut prev_map: HashMap<i32, &GpuProcess> =
        previous.processes.iter().map(|p| (p.pid, p)).collect();

    let mut delta = Delta {
        update_id,
        ..Default::default()
    };

    for proc in &current.processes {
        match prev_map.remove(&proc.pid) {
            None => delta.added.push(proc.clone()),
            Some(prev) => {
                if record_changed(prev, proc) {
                    delta.updated.push(proc.clone());
                }
            }
        }
    }

    // Whatever was not visited no longer exists
    delta.removed = prev_map.into_keys().collect();
    delta.removed.sort_unstable();

    delta
}

/// Build a delta that replays the entire snapshot as additions.
///
/// Used when a client's last known update id is stale beyond retained
/// history and the only correct answer is a full refresh.
pub fn full_refresh_delta(current: &Snapshot) -> Delta {
    Delta {
        added: current.processes.clone(),
        updated: Vec::new(),
        removed: Vec::new(),
        update_id: current.update_id,
    }
}

fn record_changed(prev: &GpuProcess, curr: &GpuProcess) -> bool {
    prev.gpu_usage_percent != curr.gpu_usage_percent
        || prev.gpu_memory_mb != curr.gpu_memory_mb
        || prev.status != curr.status
        || prev.priority != curr.priority
        || prev.process_type != curr.process_type
        || prev.command != curr.command
}
