//! Process-wide scheduler tunables.
//!
//! [`SchedulerConfig`] is shared by every mutator thread, the timer thread and
//! an optional external tuner. Each field is an independent atomic: readers
//! see a consistent value per field, but nothing is atomic across fields.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::settings::SchedulerSettings;

/// Default number of weighted safepoints before a thread escalates.
///
/// Roughly one escalation per 10ms on typical workloads.
pub const DEFAULT_SAFEPOINT_COUNT_THRESHOLD: usize = 100_000;
/// Default per-thread allocation budget (10 MiB).
pub const DEFAULT_ALLOCATION_THRESHOLD_BYTES: usize = 10 * 1024 * 1024;
/// Default cooldown between allocation-driven collections (200ms).
pub const DEFAULT_COOLDOWN_THRESHOLD_NS: u64 = 200 * 1000 * 1000;
/// Default period of the regular timer-driven collection (200ms).
pub const DEFAULT_REGULAR_INTERVAL_US: u64 = 200 * 1000;

const AGGRESSIVE_SAFEPOINT_COUNT_THRESHOLD: usize = 1_000;
const AGGRESSIVE_ALLOCATION_THRESHOLD_BYTES: usize = 10_000;
const AGGRESSIVE_COOLDOWN_THRESHOLD_NS: u64 = 0;

/// Tunable parameters of the scheduler.
///
/// All setters may be called from any thread at any time. Thread-local
/// accumulators snapshot the thresholds they need on every reset, so changes
/// take effect on each thread at its next reset.
#[derive(Debug)]
pub struct SchedulerConfig {
    /// Weighted safepoint count at which a thread escalates
    safepoint_count_threshold: AtomicUsize,
    /// Allocated bytes at which a thread escalates and a collection is forced
    allocation_threshold_bytes: AtomicUsize,
    /// Minimum time since the last collection for cooldown-driven triggering
    cooldown_threshold_ns: AtomicU64,
    /// Period of the regular timer
    regular_interval_us: AtomicU64,
    /// Reserved for an external tuner
    auto_tune: AtomicBool,
    /// Stress-test regime, fixed at construction
    aggressive_mode: bool,
}

impl SchedulerConfig {
    /// Creates a configuration with default tunables.
    ///
    /// When `aggressive_mode` is set, thresholds are shrunk so that
    /// collections happen almost continuously.
    pub fn new(aggressive_mode: bool) -> Self {
        let config = SchedulerConfig {
            safepoint_count_threshold: AtomicUsize::new(DEFAULT_SAFEPOINT_COUNT_THRESHOLD),
            allocation_threshold_bytes: AtomicUsize::new(DEFAULT_ALLOCATION_THRESHOLD_BYTES),
            cooldown_threshold_ns: AtomicU64::new(DEFAULT_COOLDOWN_THRESHOLD_NS),
            regular_interval_us: AtomicU64::new(DEFAULT_REGULAR_INTERVAL_US),
            auto_tune: AtomicBool::new(false),
            aggressive_mode,
        };
        if aggressive_mode {
            config.set_safepoint_count_threshold(AGGRESSIVE_SAFEPOINT_COUNT_THRESHOLD);
            config.set_allocation_threshold_bytes(AGGRESSIVE_ALLOCATION_THRESHOLD_BYTES);
            config.set_cooldown_threshold_ns(AGGRESSIVE_COOLDOWN_THRESHOLD_NS);
        }
        config
    }

    pub fn safepoint_count_threshold(&self) -> usize {
        self.safepoint_count_threshold.load(Ordering::Relaxed)
    }

    pub fn set_safepoint_count_threshold(&self, value: usize) {
        self.safepoint_count_threshold.store(value, Ordering::Relaxed);
    }

    pub fn allocation_threshold_bytes(&self) -> usize {
        self.allocation_threshold_bytes.load(Ordering::Relaxed)
    }

    pub fn set_allocation_threshold_bytes(&self, value: usize) {
        self.allocation_threshold_bytes.store(value, Ordering::Relaxed);
    }

    pub fn cooldown_threshold_ns(&self) -> u64 {
        self.cooldown_threshold_ns.load(Ordering::Relaxed)
    }

    pub fn set_cooldown_threshold_ns(&self, value: u64) {
        self.cooldown_threshold_ns.store(value, Ordering::Relaxed);
    }

    pub fn regular_interval_us(&self) -> u64 {
        self.regular_interval_us.load(Ordering::Relaxed)
    }

    pub fn set_regular_interval_us(&self, value: u64) {
        self.regular_interval_us.store(value, Ordering::Relaxed);
    }

    pub fn auto_tune(&self) -> bool {
        self.auto_tune.load(Ordering::Relaxed)
    }

    pub fn set_auto_tune(&self, value: bool) {
        self.auto_tune.store(value, Ordering::Relaxed);
    }

    /// Whether the stress-test regime was requested at construction.
    pub fn aggressive_mode(&self) -> bool {
        self.aggressive_mode
    }

    /// Stores every field present in `settings`.
    ///
    /// Settings are not validated here; use [`SchedulerSettings::validate`]
    /// first when they come from an untrusted source.
    pub fn apply(&self, settings: &SchedulerSettings) {
        if let Some(value) = settings.safepoint_count_threshold {
            self.set_safepoint_count_threshold(value);
        }
        if let Some(value) = settings.allocation_threshold_bytes {
            self.set_allocation_threshold_bytes(value);
        }
        if let Some(value) = settings.cooldown_threshold_ns {
            self.set_cooldown_threshold_ns(value);
        }
        if let Some(value) = settings.regular_interval_us {
            self.set_regular_interval_us(value);
        }
        if let Some(value) = settings.auto_tune {
            self.set_auto_tune(value);
        }
    }

    /// Captures the current value of every tunable.
    pub fn snapshot(&self) -> SchedulerSettings {
        SchedulerSettings {
            safepoint_count_threshold: Some(self.safepoint_count_threshold()),
            allocation_threshold_bytes: Some(self.allocation_threshold_bytes()),
            cooldown_threshold_ns: Some(self.cooldown_threshold_ns()),
            regular_interval_us: Some(self.regular_interval_us()),
            auto_tune: Some(self.auto_tune()),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(false)
    }
}
