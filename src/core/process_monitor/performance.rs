//! Rolling poll-outcome statistics that drive scheduler adaptation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

const DEFAULT_WINDOW_SIZE: usize = 32;

#[derive(Debug, Clone, Copy)]
struct PollOutcome {
    success: bool,
    latency: Duration,
}

/// Tracks success/error counts and average latency over a sliding window.
///
/// Cloning is cheap; all clones share the same window.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    inner: Arc<Mutex<Window>>,
}

#[derive(Debug)]
struct Window {
    capacity: usize,
    outcomes: VecDeque<PollOutcome>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW_SIZE)
    }

    pub fn with_window(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Window {
                capacity: capacity.max(1),
                outcomes: VecDeque::with_capacity(capacity.max(1)),
            })),
        }
    }

    pub fn record_success(&self, latency: Duration) {
        self.push(PollOutcome {
            success: true,
            latency,
        });
    }

    pub fn record_error(&self) {
        self.push(PollOutcome {
            success: false,
            latency: Duration::ZERO,
        });
    }

    fn push(&self, outcome: PollOutcome) {
        let mut window = self.inner.lock();
        if window.outcomes.len() >= window.capacity {
            window.outcomes.pop_front();
        }
        window.outcomes.push_back(outcome);
    }

    /// Fraction of failed polls in the window, 0.0 when empty
    pub fn error_rate(&self) -> f64 {
        let window = self.inner.lock();
        if window.outcomes.is_empty() {
            return 0.0;
        }
        let errors = window.outcomes.iter().filter(|o| !o.success).count();
        errors as f64 / window.outcomes.len() as f64
    }

    /// Average latency of successful polls in the window
    pub fn avg_latency(&self) -> Duration {
        let window = self.inner.lock();
        let successes: Vec<_> = window.outcomes.iter().filter(|o| o.success).collect();
        if successes.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = successes.iter().map(|o| o.latency).sum();
        total / successes.len() as u32
    }

    pub fn sample_count(&self) -> usize {
        self.inner.lock().outcomes.len()
    }

    pub fn reset(&self) {
        self.inner.lock().outcomes.clear();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
