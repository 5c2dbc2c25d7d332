//! Global collection-triggering decisions.
//!
//! A [`SchedulingPolicy`] is shared by every mutator thread. Threads only
//! reach it when their [`ThreadLocalAccumulator`] crosses a local threshold,
//! so contention is bounded to one call per crossing.
//!
//! Two implementations exist and are chosen once at construction:
//!
//! - [`TimerPolicy`]: a background [`RepeatedTimer`](crate::timer::RepeatedTimer)
//!   triggers a collection every `regular_interval_us`, whatever the mutators
//!   are doing. Escalations only look at allocated bytes by default.
//! - [`TimerlessPolicy`]: no background thread. Escalations trigger on
//!   allocated bytes or when the cooldown since the last collection has
//!   elapsed. Threads also escalate on weighted safepoint counts.
//!
//! # Lifecycle
//!
//! A policy starts out without a schedule callback. Escalating (or ticking)
//! in that state is a broken runtime invariant and panics. After
//! [`SchedulingPolicy::set_schedule_callback`] the policy is active for the
//! rest of its life.

mod timer;
mod timerless;

pub use timer::TimerPolicy;
pub use timerless::TimerlessPolicy;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};

use crate::accumulator::ThreadLocalAccumulator;
use crate::clock::Clock;
use crate::config::SchedulerConfig;

/// Zero-argument trigger handed to the collector.
///
/// Invoked from arbitrary mutator threads and from the timer thread, possibly
/// concurrently. Deduplicating overlapping requests is the collector's job.
pub type ScheduleCallback = Arc<dyn Fn() + Send + Sync>;

/// Which implementation a policy is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Regular collections driven by a background timer
    Timer,
    /// Collections driven only by mutator escalations
    Timerless,
}

/// Condition under which an escalation triggers a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationRule {
    /// The escalating thread allocated more than `allocation_threshold_bytes`
    AllocationOnly,
    /// As above, or at least `cooldown_threshold_ns` passed since the last
    /// finished collection
    AllocationOrCooldown,
}

impl EscalationRule {
    /// Rule used when none is requested explicitly.
    pub fn default_for(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Timer => EscalationRule::AllocationOnly,
            PolicyKind::Timerless => EscalationRule::AllocationOrCooldown,
        }
    }
}

/// The global half of the scheduler.
pub trait SchedulingPolicy: Send + Sync {
    /// Called by a mutator thread whose accumulator crossed a local threshold.
    ///
    /// # Panics
    ///
    /// Panics if no schedule callback has been registered yet.
    fn on_safepoint_escalation(&self, thread: &ThreadLocalAccumulator);

    /// Records that a collection just completed.
    ///
    /// Called once per collection by the thread that performed it.
    fn on_collection_finished(&self);

    /// Registers the collection trigger. Can only be done once.
    ///
    /// # Panics
    ///
    /// Panics if a callback is already registered.
    fn set_schedule_callback(&self, callback: ScheduleCallback);

    /// Which implementation this is.
    fn kind(&self) -> PolicyKind;

    /// Rule applied to escalations.
    fn escalation_rule(&self) -> EscalationRule;

    /// Whether a schedule callback has been registered.
    fn is_active(&self) -> bool;

    /// Clock reading taken when the last collection finished, or when the
    /// policy was created if none has yet.
    fn time_of_last_collection_ns(&self) -> u64;

    /// Whether threads should count weighted safepoints.
    ///
    /// Only policies without a timer need safepoint counts to guarantee
    /// progress.
    fn counts_safepoints(&self) -> bool {
        self.kind() == PolicyKind::Timerless
    }
}

/// Builds the policy for `kind`, using its default rule unless `rule` is given.
pub fn make_policy(
    kind: PolicyKind,
    config: Arc<SchedulerConfig>,
    clock: Arc<dyn Clock>,
    rule: Option<EscalationRule>,
) -> Arc<dyn SchedulingPolicy> {
    let rule = rule.unwrap_or_else(|| EscalationRule::default_for(kind));
    match kind {
        PolicyKind::Timer => Arc::new(TimerPolicy::with_rule(config, clock, rule)),
        PolicyKind::Timerless => Arc::new(TimerlessPolicy::with_rule(config, clock, rule)),
    }
}

/// State shared by both policy implementations.
///
/// Lives behind an `Arc` so the timer thread can reach it without owning the
/// policy itself.
pub(crate) struct PolicyState {
    config: Arc<SchedulerConfig>,
    clock: Arc<dyn Clock>,
    rule: EscalationRule,
    time_of_last_collection_ns: AtomicU64,
    schedule: OnceLock<ScheduleCallback>,
}

impl PolicyState {
    pub(crate) fn new(config: Arc<SchedulerConfig>, clock: Arc<dyn Clock>, rule: EscalationRule) -> Self {
        let now = clock.now_ns();
        PolicyState {
            config,
            clock,
            rule,
            time_of_last_collection_ns: AtomicU64::new(now),
            schedule: OnceLock::new(),
        }
    }

    pub(crate) fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub(crate) fn rule(&self) -> EscalationRule {
        self.rule
    }

    pub(crate) fn is_active(&self) -> bool {
        self.schedule.get().is_some()
    }

    pub(crate) fn time_of_last_collection_ns(&self) -> u64 {
        self.time_of_last_collection_ns.load(Ordering::Acquire)
    }

    fn callback(&self, caller: &str) -> &ScheduleCallback {
        match self.schedule.get() {
            Some(callback) => callback,
            None => panic!("{caller} called before the schedule callback was set"),
        }
    }

    pub(crate) fn set_callback(&self, callback: ScheduleCallback) {
        if self.schedule.set(callback).is_err() {
            panic!("schedule callback must not have been set already");
        }
    }

    /// Whether a thread reporting `allocated_bytes` should trigger a collection.
    pub(crate) fn should_collect(&self, allocated_bytes: usize) -> bool {
        if allocated_bytes > self.config.allocation_threshold_bytes() {
            return true;
        }
        match self.rule {
            EscalationRule::AllocationOnly => false,
            EscalationRule::AllocationOrCooldown => {
                let elapsed = self.clock.now_ns().saturating_sub(self.time_of_last_collection_ns());
                elapsed >= self.config.cooldown_threshold_ns()
            }
        }
    }

    pub(crate) fn escalate(&self, thread: &ThreadLocalAccumulator) {
        let schedule = self.callback("on_safepoint_escalation");
        let allocated_bytes = thread.allocated_bytes();
        if self.should_collect(allocated_bytes) {
            debug!(
                allocated_bytes,
                safepoint_weight = thread.safepoint_weight(),
                "escalation triggers collection"
            );
            schedule();
        } else {
            trace!(allocated_bytes, "escalation below collection thresholds");
        }
    }

    pub(crate) fn tick(&self) {
        let schedule = self.callback("on_timer_tick");
        trace!("regular collection tick");
        schedule();
    }

    pub(crate) fn collection_finished(&self) {
        let now = self.clock.now_ns();
        self.time_of_last_collection_ns.store(now, Ordering::Release);
        debug!(time_ns = now, "collection finished");
    }
}

impl fmt::Debug for PolicyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyState")
            .field("rule", &self.rule)
            .field("active", &self.is_active())
            .field("time_of_last_collection_ns", &self.time_of_last_collection_ns())
            .finish()
    }
}
