//! Update batching with per-pid deduplication.
//!
//! Coalesces the individual process updates produced within one window into
//! a single emission so downstream consumers re-render at most once per
//! window regardless of how many processes changed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::types::GpuProcess;

pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(200);

const EMIT_CHANNEL_CAPACITY: usize = 16;

/// Accumulates process updates and flushes them as one deduplicated batch.
///
/// Dedup is keyed by pid with last-write-wins semantics; the later record
/// is assumed fresher. At most one flush timer is outstanding at a time.
#[derive(Clone)]
pub struct BatchAggregator {
    state: Arc<Mutex<BatchState>>,
    emit_tx: broadcast::Sender<Vec<GpuProcess>>,
    window: Duration,
}

struct BatchState {
    buffer: Vec<GpuProcess>,
    timer: Option<JoinHandle<()>>,
}

impl BatchAggregator {
    pub fn new(window: Duration) -> Self {
        let (emit_tx, _) = broadcast::channel(EMIT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(BatchState {
                buffer: Vec::new(),
                timer: None,
            })),
            emit_tx,
            window,
        }
    }

    /// Subscribe to flushed batches
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<GpuProcess>> {
        self.emit_tx.subscribe()
    }

    /// Append a record and arm the flush timer if none is pending
    pub fn add(&self, record: GpuProcess) {
        let mut state = self.state.lock();
        state.buffer.push(record);

        if state.timer.is_none() {
            let state_ref = Arc::clone(&self.state);
            let emit_tx = self.emit_tx.clone();
            let window = self.window;
            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(window).await;
                flush_inner(&state_ref, &emit_tx, true);
            }));
        }
    }

    /// Emit the current buffer immediately; a no-op when empty
    pub fn flush(&self) {
        flush_inner(&self.state, &self.emit_tx, false);
    }

    /// True when a timer is armed or records are waiting
    pub fn is_pending(&self) -> bool {
        let state = self.state.lock();
        state.timer.is_some() || !state.buffer.is_empty()
    }
}

fn flush_inner(
    state: &Mutex<BatchState>,
    emit_tx: &broadcast::Sender<Vec<GpuProcess>>,
    from_timer: bool,
) {
    let batch = {
        let mut state = state.lock();
        if from_timer {
            // The timer task is running right now; just clear its handle
            state.timer = None;
        } else if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        if state.buffer.is_empty() {
            return;
        }
        dedupe_last_wins(std::mem::take(&mut state.buffer))
    };

    // send() only fails when nobody is subscribed, which is fine
    let _ = emit_tx.send(batch);
}

/// Deduplicate by pid keeping the last-inserted record, preserving the
/// order in which pids first appeared.
fn dedupe_last_wins(buffer: Vec<GpuProcess>) -> Vec<GpuProcess> {
    let mut order: Vec<i32> = Vec::new();
    let mut latest: HashMap<i32, GpuProcess> = HashMap::with_capacity(buffer.len());

    for record in buffer {
        if !latest.contains_key(&record.pid) {
            order.push(record.pid);
        }
        latest.insert(record.pid, record);
    }

    order
        .into_iter()
        .filter_map(|pid| latest.remove(&pid))
        .collect()
}
