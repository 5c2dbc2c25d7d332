//! Scheduler composition root.
//!
//! A [`Scheduler`] owns the shared [`SchedulerConfig`] and the
//! [`SchedulingPolicy`] chosen for this runtime, and hands out one
//! [`ThreadLocalAccumulator`] per attached mutator thread.

use std::sync::Arc;

use tracing::info;

use crate::accumulator::ThreadLocalAccumulator;
use crate::clock::{Clock, MonotonicClock};
use crate::config::SchedulerConfig;
use crate::error::ConfigResult;
use crate::policy::{make_policy, EscalationRule, PolicyKind, SchedulingPolicy};
use crate::settings::SchedulerSettings;

/// Construction-time choices for a [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Stress-test regime with tiny thresholds and no timer
    pub aggressive: bool,
    /// Whether a background timer thread may be started
    pub threads_supported: bool,
    /// Overrides the escalation rule of the selected policy
    pub escalation_rule: Option<EscalationRule>,
    /// Tunables applied on top of the mode defaults
    pub settings: SchedulerSettings,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            aggressive: false,
            threads_supported: !cfg!(target_family = "wasm"),
            escalation_rule: None,
            settings: SchedulerSettings::default(),
        }
    }
}

impl SchedulerOptions {
    /// Options selecting the aggressive stress-test regime.
    pub fn aggressive() -> Self {
        SchedulerOptions {
            aggressive: true,
            ..Self::default()
        }
    }

    /// Options for a runtime that cannot run a timer thread.
    pub fn timerless() -> Self {
        SchedulerOptions {
            threads_supported: false,
            ..Self::default()
        }
    }

    /// Replaces the tunables applied at construction.
    pub fn with_settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Forces a particular escalation rule.
    pub fn with_escalation_rule(mut self, rule: EscalationRule) -> Self {
        self.escalation_rule = Some(rule);
        self
    }

    /// The policy these options select.
    ///
    /// Aggressive mode relies on safepoint counting instead of a timer.
    pub fn policy_kind(&self) -> PolicyKind {
        if self.threads_supported && !self.aggressive {
            PolicyKind::Timer
        } else {
            PolicyKind::Timerless
        }
    }
}

/// Owns the scheduler configuration and policy.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use gc_scheduler::{PolicyKind, Scheduler, SchedulerOptions};
///
/// let scheduler = Scheduler::new(SchedulerOptions::aggressive());
/// assert_eq!(scheduler.policy().kind(), PolicyKind::Timerless);
///
/// scheduler.policy().set_schedule_callback(Arc::new(|| {
///     // ask the collector to run
/// }));
///
/// let mut thread = scheduler.new_thread_accumulator();
/// thread.record_allocation(64);
/// ```
pub struct Scheduler {
    config: Arc<SchedulerConfig>,
    policy: Arc<dyn SchedulingPolicy>,
}

impl Scheduler {
    /// Creates a scheduler measuring time with a [`MonotonicClock`].
    ///
    /// `options.settings` are applied without validation; see
    /// [`Scheduler::try_new`].
    pub fn new(options: SchedulerOptions) -> Self {
        Self::with_clock(options, Arc::new(MonotonicClock::new()))
    }

    /// Like [`Scheduler::new`], but rejects unusable settings.
    pub fn try_new(options: SchedulerOptions) -> ConfigResult<Self> {
        options.settings.validate(options.aggressive)?;
        Ok(Self::new(options))
    }

    /// Creates a scheduler with an explicit time source.
    pub fn with_clock(options: SchedulerOptions, clock: Arc<dyn Clock>) -> Self {
        let config = Arc::new(SchedulerConfig::new(options.aggressive));
        config.apply(&options.settings);

        let kind = options.policy_kind();
        let policy = make_policy(kind, Arc::clone(&config), clock, options.escalation_rule);

        info!(
            ?kind,
            rule = ?policy.escalation_rule(),
            aggressive = options.aggressive,
            "GC scheduler created"
        );

        Scheduler { config, policy }
    }

    /// Shared tunables. Every field may be updated concurrently.
    pub fn config(&self) -> &Arc<SchedulerConfig> {
        &self.config
    }

    /// The policy, for the collector to register its trigger and report
    /// finished collections.
    pub fn policy(&self) -> &Arc<dyn SchedulingPolicy> {
        &self.policy
    }

    /// Creates the accumulator for a newly attached mutator thread.
    pub fn new_thread_accumulator(&self) -> ThreadLocalAccumulator {
        ThreadLocalAccumulator::new(Arc::clone(&self.config), Arc::clone(&self.policy))
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerOptions::default())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("policy", &self.policy.kind())
            .finish()
    }
}
