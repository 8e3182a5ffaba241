//! Fixed-period tick scheduler for Playgate's background jobs.
//!
//! A [`TickScheduler`] wakes its owner once per `period` (e.g. every
//! second for the expiry scanner), watches how long each tick's work
//! takes against that period, and decides what happens when a tick
//! runs long.
//!
//! # Integration
//!
//! The scheduler is designed to sit inside a job's `tokio::select!` loop,
//! next to the shutdown signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = cancel.cancelled() => break,
//!         info = scheduler.wait_for_tick() => {
//!             run_one_pass(info.tick).await;
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! All timing uses `tokio::time`, so tests under a paused clock see
//! exact tick instants and exact work durations.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late because the previous one ran long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Forget the missed ticks and restart the cadence from now.
    /// Never produces a burst of back-to-back ticks.
    #[default]
    Skip,
    /// Forget the missed ticks but keep the original cadence: the next
    /// tick lands on the first slot of the original grid that is still
    /// in the future.
    Drop,
}

/// Full configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. Default: 1 second.
    pub period: Duration,
    /// Overrun handling policy.
    pub policy: TickPolicy,
    /// Budget warning threshold (0.0–1.0). Default: 0.80 (80%).
    /// A tracing warning is emitted when a tick's work exceeds this
    /// fraction of the period.
    pub budget_warn_threshold: f64,
    /// Budget critical threshold (0.0–1.0). Default: 1.0 (100%).
    pub budget_critical_threshold: f64,
    /// Enable per-tick timing metrics.
    pub metrics_enabled: bool,
    /// Random delay (0..max) added to the *first* tick, so several
    /// processes started together don't scan a shared store in lockstep.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
            initial_jitter: Duration::from_millis(100),
        }
    }
}

impl TickConfig {
    /// Shortest period the scheduler will accept.
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);

    /// Create a config for a specific period with sensible defaults.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. Rules:
    /// - `period` raised to at least [`Self::MIN_PERIOD`].
    /// - Thresholds clamped to `0.0..=1.0`.
    /// - `budget_warn_threshold` forced ≤ `budget_critical_threshold`.
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_secs_f64() * 1000.0,
                min_ms = Self::MIN_PERIOD.as_millis() as u64,
                "tick period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        if self.budget_warn_threshold > self.budget_critical_threshold {
            self.budget_warn_threshold = self.budget_critical_threshold;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired late (more than 10% of a period).
    pub overrun: bool,
    /// How many whole periods were skipped because of the overrun.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the tick scheduler.
///
/// Timing values refer to the work done between
/// [`TickScheduler::wait_for_tick`] returning and
/// [`TickScheduler::record_tick_end`] being called.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Total overruns detected.
    pub total_overruns: u64,
    /// Total periods skipped.
    pub total_skipped: u64,
    /// Exponential moving average of tick work time (α = 0.1).
    pub avg_tick_time: Duration,
    /// Maximum tick work time observed.
    pub max_tick_time: Duration,
    /// Last tick's work time as a fraction of the period. >1.0 means overrun.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick scheduler. One per background job.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// When the next tick should fire.
    next_tick: Instant,
    /// When the current tick's work started.
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler from config.
    ///
    /// The first tick fires one period from now, plus optional jitter.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let max_ns = u64::try_from(config.initial_jitter.as_nanos()).unwrap_or(u64::MAX);
        let jitter = if max_ns > 0 {
            Duration::from_nanos(rand::rng().random_range(0..max_ns))
        } else {
            Duration::ZERO
        };
        let next_tick = Instant::now() + config.period + jitter;

        debug!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick scheduler created"
        );

        Self {
            config,
            tick_count: 0,
            next_tick,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Create a scheduler for a specific period with default settings.
    pub fn with_period(period: Duration) -> Self {
        Self::new(TickConfig::with_period(period))
    }

    /// Wait until the next tick is due. Returns [`TickInfo`] for the tick.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let due = self.next_tick;
        let period = self.config.period;

        time::sleep_until(due).await;

        let now = Instant::now();
        self.tick_count += 1;
        self.tick_start = Some(now);

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > period / 10;
        let behind = if overrun {
            (late_by.as_nanos() / period.as_nanos()) as u64
        } else {
            0
        };

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if behind > 0 {
                    warn!(
                        tick = self.tick_count,
                        skipped = behind,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, restarting cadence"
                    );
                }
                now + period
            }
            TickPolicy::Drop => {
                if behind > 0 {
                    warn!(
                        tick = self.tick_count,
                        dropped = behind,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, dropping missed slots"
                    );
                }
                let slots = u32::try_from(behind.saturating_add(1)).unwrap_or(u32::MAX);
                due + period.saturating_mul(slots)
            }
        };

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += behind;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped: behind,
        }
    }

    /// Record that the work for the current tick has finished.
    ///
    /// Enables budget monitoring and metrics. If not called, budget
    /// warnings won't fire.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let budget = self.config.period;

        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "CRITICAL: tick exceeded budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching budget limit"
            );
        }

        if self.config.metrics_enabled {
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            // Exponential moving average (α = 0.1).
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            let curr = elapsed.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
        }
    }

    /// Current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The (validated) tick period.
    pub fn period(&self) -> Duration {
        self.config.period
    }

    pub fn policy(&self) -> TickPolicy {
        self.config.policy
    }
}
