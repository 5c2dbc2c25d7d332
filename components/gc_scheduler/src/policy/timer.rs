//! Policy with a regular background collection timer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use super::{EscalationRule, PolicyKind, PolicyState, ScheduleCallback, SchedulingPolicy};
use crate::accumulator::ThreadLocalAccumulator;
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::timer::RepeatedTimer;

/// Triggers a collection every `regular_interval_us` on a background thread,
/// in addition to allocation-driven escalations.
///
/// The timer ignores the cooldown: a collection happens on schedule even if
/// one just finished. This puts a hard upper bound on the time between
/// collections for idle or rarely-polling mutators.
///
/// The timer is armed by [`SchedulingPolicy::set_schedule_callback`], never
/// earlier, and stops when the policy is dropped.
pub struct TimerPolicy {
    /// State shared with the timer thread
    state: Arc<PolicyState>,
    /// Present once the schedule callback is set
    timer: Mutex<Option<RepeatedTimer>>,
}

impl TimerPolicy {
    /// Creates a timer policy with the allocation-only escalation rule.
    pub fn new(config: Arc<SchedulerConfig>, clock: Arc<dyn Clock>) -> Self {
        Self::with_rule(config, clock, EscalationRule::default_for(PolicyKind::Timer))
    }

    /// Creates a timer policy with an explicit escalation rule.
    pub fn with_rule(config: Arc<SchedulerConfig>, clock: Arc<dyn Clock>, rule: EscalationRule) -> Self {
        TimerPolicy {
            state: Arc::new(PolicyState::new(config, clock, rule)),
            timer: Mutex::new(None),
        }
    }

    /// Runs one regular tick: invokes the schedule callback unconditionally.
    ///
    /// Called by the timer thread; exposed so embedders and tests can drive
    /// ticks by hand.
    ///
    /// # Panics
    ///
    /// Panics if no schedule callback has been registered yet.
    pub fn on_timer_tick(&self) {
        self.state.tick();
    }

    /// Whether the background timer has been started.
    pub fn is_timer_running(&self) -> bool {
        self.timer.lock().is_some()
    }
}

fn regular_interval(config: &SchedulerConfig) -> Duration {
    // A zero period would spin the timer thread
    Duration::from_micros(config.regular_interval_us().max(1))
}

impl SchedulingPolicy for TimerPolicy {
    fn on_safepoint_escalation(&self, thread: &ThreadLocalAccumulator) {
        self.state.escalate(thread);
    }

    fn on_collection_finished(&self) {
        self.state.collection_finished();
    }

    fn set_schedule_callback(&self, callback: ScheduleCallback) {
        self.state.set_callback(callback);

        let interval = regular_interval(self.state.config());
        let state = Arc::clone(&self.state);
        let timer = RepeatedTimer::new(interval, move || {
            state.tick();
            regular_interval(state.config())
        });
        *self.timer.lock() = Some(timer);

        info!(interval_us = interval.as_micros() as u64, "regular collection timer armed");
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Timer
    }

    fn escalation_rule(&self) -> EscalationRule {
        self.state.rule()
    }

    fn is_active(&self) -> bool {
        self.state.is_active()
    }

    fn time_of_last_collection_ns(&self) -> u64 {
        self.state.time_of_last_collection_ns()
    }
}

impl std::fmt::Debug for TimerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerPolicy")
            .field("state", &self.state)
            .field("timer_running", &self.is_timer_running())
            .finish()
    }
}
