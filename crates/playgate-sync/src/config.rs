//! Configuration for the background jobs.

use std::time::Duration;

use playgate_tick::{TickConfig, TickPolicy};
use tracing::warn;

/// How often the scanner runs and what counts as "about to expire".
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time between scanner ticks. Default: 1 second.
    pub scan_interval: Duration,

    /// An entry whose remaining TTL is at or below this is migrated.
    /// Must leave room for at least one tick before the store evicts
    /// the key itself. Default: 5 seconds.
    pub expiry_threshold: Duration,

    /// What the scanner does after a tick that ran longer than
    /// `scan_interval`. Default: [`TickPolicy::Skip`].
    pub scan_policy: TickPolicy,

    /// Replay the archive into the cache at startup. Default: `true`.
    pub restore_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(1),
            expiry_threshold: Duration::from_secs(5),
            scan_policy: TickPolicy::Skip,
            restore_on_start: true,
        }
    }
}

impl SyncConfig {
    /// Clamp values that would let entries expire unseen.
    ///
    /// - `scan_interval` raised to [`TickConfig::MIN_PERIOD`].
    /// - `expiry_threshold` raised to `scan_interval`; with a smaller
    ///   threshold an entry could cross it and expire between two ticks.
    pub fn validated(mut self) -> Self {
        if self.scan_interval < TickConfig::MIN_PERIOD {
            warn!(
                interval_ms = self.scan_interval.as_millis() as u64,
                "scan_interval below minimum, clamping"
            );
            self.scan_interval = TickConfig::MIN_PERIOD;
        }
        if self.expiry_threshold < self.scan_interval {
            warn!(
                threshold_ms = self.expiry_threshold.as_millis() as u64,
                interval_ms = self.scan_interval.as_millis() as u64,
                "expiry_threshold shorter than scan_interval, raising it"
            );
            self.expiry_threshold = self.scan_interval;
        }
        self
    }

    /// The tick configuration the scanner runs with.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            period: self.scan_interval,
            policy: self.scan_policy,
            ..TickConfig::default()
        }
    }
}
