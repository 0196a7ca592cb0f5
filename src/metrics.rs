//! Metrics module - tick timing and control loop counters

use hdrhistogram::Histogram;
use std::time::Duration;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::GimbalError;

// ============================================================================
// TICK METRICS - Thread-safe performance tracking
// ============================================================================

#[derive(Clone)]
pub struct TickMetrics {
    tick_hist: Arc<Mutex<Histogram<u64>>>,
    // Jitter of the simulation timestep around its previous value
    last_dt_ns: Arc<AtomicU64>,
    jitter_hist: Arc<Mutex<Histogram<u64>>>,
    ticks_completed: Arc<AtomicU64>,
    ticks_skipped: Arc<AtomicU64>,
    commands_issued: Arc<AtomicU64>,
    telemetry_dropped: Arc<AtomicU64>,
    missed_deadlines: Arc<AtomicU64>,
}

impl TickMetrics {
    pub fn new() -> Result<Self, GimbalError> {
        Ok(Self {
            tick_hist: Arc::new(Mutex::new(Histogram::new(3)?)),
            last_dt_ns: Arc::new(AtomicU64::new(0)),
            jitter_hist: Arc::new(Mutex::new(Histogram::new(3)?)),
            ticks_completed: Arc::new(AtomicU64::new(0)),
            ticks_skipped: Arc::new(AtomicU64::new(0)),
            commands_issued: Arc::new(AtomicU64::new(0)),
            telemetry_dropped: Arc::new(AtomicU64::new(0)),
            missed_deadlines: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Records how long one tick took against its step budget.
    pub fn record_tick(&self, duration: Duration, budget: Duration) {
        // try_lock: a concurrent report() must not stall the tick
        if let Some(mut hist) = self.tick_hist.try_lock() {
            hist.record(duration.as_nanos() as u64).ok();
        }
        if duration > budget {
            self.missed_deadlines.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record jitter (variation between consecutive timesteps)
    pub fn record_dt(&self, dt: Duration) {
        let dt_ns = dt.as_nanos() as u64;
        let last = self.last_dt_ns.swap(dt_ns, Ordering::Relaxed);
        if last > 0 {
            if let Some(mut hist) = self.jitter_hist.try_lock() {
                hist.record(dt_ns.abs_diff(last)).ok();
            }
        }
    }

    pub fn tick_completed(&self, commands: u64) {
        self.ticks_completed.fetch_add(1, Ordering::Relaxed);
        self.commands_issued.fetch_add(commands, Ordering::Relaxed);
    }

    pub fn tick_skipped(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn telemetry_dropped(&self) {
        self.telemetry_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let tick = self.tick_hist.lock();
        let jitter = self.jitter_hist.lock();

        MetricsReport {
            tick_p50: Duration::from_nanos(tick.value_at_quantile(0.5)),
            tick_p99: Duration::from_nanos(tick.value_at_quantile(0.99)),
            tick_max: Duration::from_nanos(tick.max()),
            jitter_p50: Duration::from_nanos(jitter.value_at_quantile(0.5)),
            jitter_p99: Duration::from_nanos(jitter.value_at_quantile(0.99)),
            ticks_completed: self.ticks_completed.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            commands_issued: self.commands_issued.load(Ordering::Relaxed),
            telemetry_dropped: self.telemetry_dropped.load(Ordering::Relaxed),
            missed_deadlines: self.missed_deadlines.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// METRICS REPORT - Summary statistics
// ============================================================================

#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub tick_p50: Duration,
    pub tick_p99: Duration,
    pub tick_max: Duration,
    pub jitter_p50: Duration,
    pub jitter_p99: Duration,
    pub ticks_completed: u64,
    pub ticks_skipped: u64,
    pub commands_issued: u64,
    pub telemetry_dropped: u64,
    pub missed_deadlines: u64,
}

impl MetricsReport {
    /// Percentage of ticks that finished inside their budget.
    pub fn deadline_compliance(&self) -> f64 {
        let total = self.ticks_completed + self.ticks_skipped;
        if total == 0 {
            return 100.0;
        }
        (total.saturating_sub(self.missed_deadlines)) as f64 / total as f64 * 100.0
    }
}
