//! Adaptive polling scheduler.
//!
//! Owns named polling jobs, each ticking on its own tokio task so a slow
//! poll can never starve the others. Effective intervals stretch when the
//! host app is hidden or when the recent error rate is high, and snap back
//! to the base interval as soon as the condition clears.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{MonitorError, Result};

use super::performance::PerformanceMonitor;

/// Boxed future returned by polling job closures
pub type PollFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type PollFn = Arc<dyn Fn() -> PollFuture + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Multiplier applied to base intervals while the app is hidden
    pub background_factor: u32,
    /// Error rate above which intervals double
    pub error_rate_threshold: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            background_factor: 4,
            error_rate_threshold: 0.5,
        }
    }
}

struct PollingJob {
    base_interval: Duration,
    poll: PollFn,
    perf: PerformanceMonitor,
    /// Some while Running; signals the tick loop to wind down
    stop_tx: Option<watch::Sender<bool>>,
}

/// Scheduler for named polling jobs with visibility/error-rate adaptation.
///
/// Jobs are keyed by name and started/stopped independently; there are
/// only two states per job (Stopped and Running).
pub struct PollScheduler {
    jobs: Mutex<HashMap<String, PollingJob>>,
    visible_tx: watch::Sender<bool>,
    config: SchedulerConfig,
}

impl PollScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (visible_tx, _) = watch::channel(true);
        Self {
            jobs: Mutex::new(HashMap::new()),
            visible_tx,
            config,
        }
    }

    /// Register a job in the Stopped state.
    ///
    /// Re-registering an existing name replaces the job; a running loop
    /// under the old registration is signalled to wind down.
    pub fn register<F>(&self, name: &str, base_interval: Duration, poll: F)
    where
        F: Fn() -> PollFuture + Send + Sync + 'static,
    {
        let mut jobs = self.jobs.lock();
        let replaced = jobs.insert(
            name.to_string(),
            PollingJob {
                base_interval,
                poll: Arc::new(poll),
                perf: PerformanceMonitor::new(),
                stop_tx: None,
            },
        );
        if let Some(old) = replaced {
            if let Some(stop_tx) = old.stop_tx {
                stop_tx.send_replace(true);
            }
        }
    }

    /// Move a job to Running, winding down any prior loop first.
    ///
    /// Safe to call on an already-running job; the old tick loop stops
    /// scheduling new ticks, finishes any in-flight poll, and exits.
    pub fn start(&self, name: &str) -> Result<()> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(name)
            .ok_or_else(|| MonitorError::UnknownJob(name.to_string()))?;

        if let Some(stop_tx) = job.stop_tx.take() {
            stop_tx.send_replace(true);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let poll = Arc::clone(&job.poll);
        let perf = job.perf.clone();
        let base = job.base_interval;
        let visible_rx = self.visible_tx.subscribe();
        let config = self.config.clone();
        let job_name = name.to_string();

        tokio::spawn(tick_loop(
            job_name, base, poll, perf, visible_rx, stop_rx, config,
        ));
        job.stop_tx = Some(stop_tx);

        log::debug!("polling job '{}' started", name);
        Ok(())
    }

    /// Move a job to Stopped, cancelling its pending tick.
    ///
    /// An in-flight poll runs to completion; the signal takes effect at
    /// the next checkpoint and no further ticks fire. Stopping twice is
    /// safe.
    pub fn stop(&self, name: &str) -> Result<()> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(name)
            .ok_or_else(|| MonitorError::UnknownJob(name.to_string()))?;

        if let Some(stop_tx) = job.stop_tx.take() {
            stop_tx.send_replace(true);
            log::debug!("polling job '{}' stopping", name);
        }
        Ok(())
    }

    pub fn start_all(&self) {
        let names: Vec<String> = self.jobs.lock().keys().cloned().collect();
        for name in names {
            let _ = self.start(&name);
        }
    }

    pub fn stop_all(&self) {
        let names: Vec<String> = self.jobs.lock().keys().cloned().collect();
        for name in names {
            let _ = self.stop(&name);
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.jobs
            .lock()
            .get(name)
            .map(|job| job.stop_tx.is_some())
            .unwrap_or(false)
    }

    /// Signal a foreground/background change to all jobs.
    ///
    /// send_replace stores the value even while no job is running, so a
    /// job started later still sees the current visibility.
    pub fn set_visible(&self, visible: bool) {
        self.visible_tx.send_replace(visible);
    }

    /// Performance stats for one job
    pub fn performance(&self, name: &str) -> Option<PerformanceMonitor> {
        self.jobs.lock().get(name).map(|job| job.perf.clone())
    }

    /// The interval the job would use for its next tick
    pub fn effective_interval(&self, name: &str) -> Option<Duration> {
        let jobs = self.jobs.lock();
        let job = jobs.get(name)?;
        Some(adapt_interval(
            job.base_interval,
            *self.visible_tx.borrow(),
            job.perf.error_rate(),
            &self.config,
        ))
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        for job in self.jobs.lock().values_mut() {
            if let Some(stop_tx) = job.stop_tx.take() {
                stop_tx.send_replace(true);
            }
        }
    }
}

/// Compute the effective interval for the next tick.
///
/// Visibility wins over error backoff when both conditions hold; a hidden
/// app has no UI to serve, so it is the stronger signal.
fn adapt_interval(
    base: Duration,
    visible: bool,
    error_rate: f64,
    config: &SchedulerConfig,
) -> Duration {
    if !visible {
        base * config.background_factor
    } else if error_rate > config.error_rate_threshold {
        base * 2
    } else {
        base
    }
}

/// Per-job tick loop. Ticks are strictly sequential within one job: the
/// next sleep starts only after the current poll returns. The stop
/// signal is checked only around the sleep, so an in-flight poll is
/// never cancelled mid-await.
async fn tick_loop(
    name: String,
    base: Duration,
    poll: PollFn,
    perf: PerformanceMonitor,
    visible_rx: watch::Receiver<bool>,
    mut stop_rx: watch::Receiver<bool>,
    config: SchedulerConfig,
) {
    loop {
        let interval = adapt_interval(base, *visible_rx.borrow(), perf.error_rate(), &config);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop_rx.changed() => {
                log::debug!("polling job '{}' stopped", name);
                return;
            }
        }

        let started = Instant::now();
        match (poll)().await {
            Ok(()) => perf.record_success(started.elapsed()),
            Err(e) => {
                // A failed tick never stops the schedule
                log::warn!("poll '{}' failed: {}", name, e);
                perf.record_error();
            }
        }

        if *stop_rx.borrow() {
            log::debug!("polling job '{}' stopped", name);
            return;
        }
    }
}
