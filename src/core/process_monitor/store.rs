//! Snapshot storage and delta replay.
//!
//! Owns the current snapshot, the wrapping update counter, and a bounded
//! ring of past snapshots so recent clients can be served an incremental
//! delta instead of a full refresh.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::delta::compute_delta;
use super::types::{Delta, GpuProcess, Snapshot};

pub const DEFAULT_HISTORY_RETENTION: usize = 32;

/// Answer to "what changed since update id X?"
#[derive(Debug, Clone)]
pub enum DeltaSince {
    /// Client already has the latest snapshot
    UpToDate,
    /// Incremental changes from the client's snapshot to now
    Changes(Delta),
    /// The client's update id fell out of retained history
    Stale,
}

pub struct SnapshotStore {
    inner: Mutex<StoreState>,
}

struct StoreState {
    current: Snapshot,
    history: VecDeque<Snapshot>,
    retention: usize,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_HISTORY_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            inner: Mutex::new(StoreState {
                current: Snapshot::default(),
                history: VecDeque::with_capacity(retention),
                retention: retention.max(1),
            }),
        }
    }

    /// Apply a successful poll result.
    ///
    /// Bumps the update id and archives the previous snapshot only when
    /// something actually changed; an identical poll returns None and
    /// leaves the counter untouched. Callers must not call this for a
    /// failed poll; skipping the call is what keeps the previous snapshot
    /// intact.
    pub fn apply(&self, processes: Vec<GpuProcess>) -> Option<Delta> {
        let mut state = self.inner.lock();

        let next_id = state.current.update_id.wrapping_add(1);
        let incoming = Snapshot::new(processes, next_id);
        let delta = compute_delta(&state.current, &incoming, next_id);

        if delta.is_empty() {
            // Nothing observable changed; keep the id stable so clients
            // can cheaply detect "no news"
            state.current.timestamp = incoming.timestamp;
            return None;
        }

        let previous = std::mem::replace(&mut state.current, incoming);
        if state.history.len() >= state.retention {
            state.history.pop_front();
        }
        state.history.push_back(previous);

        Some(delta)
    }

    /// Incremental changes for a client at `last_update_id`, recomputed
    /// from the retained snapshot so merged intermediate states collapse
    /// into one delta.
    pub fn delta_since(&self, last_update_id: u64) -> DeltaSince {
        let state = self.inner.lock();

        if last_update_id == state.current.update_id {
            return DeltaSince::UpToDate;
        }

        let retained = state
            .history
            .iter()
            .find(|snap| snap.update_id == last_update_id);

        match retained {
            Some(snapshot) => DeltaSince::Changes(compute_delta(
                snapshot,
                &state.current,
                state.current.update_id,
            )),
            None => DeltaSince::Stale,
        }
    }

    pub fn current(&self) -> Snapshot {
        self.inner.lock().current.clone()
    }

    pub fn update_id(&self) -> u64 {
        self.inner.lock().current.update_id
    }

    pub fn process_count(&self) -> usize {
        self.inner.lock().current.processes.len()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
