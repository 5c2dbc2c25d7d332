//! Policy driven purely by mutator escalations.

use std::sync::Arc;

use super::{EscalationRule, PolicyKind, PolicyState, ScheduleCallback, SchedulingPolicy};
use crate::accumulator::ThreadLocalAccumulator;
use crate::clock::Clock;
use crate::config::SchedulerConfig;

/// Triggers collections only from escalating mutator threads.
///
/// Used when the platform has no threads or in aggressive mode. Without a
/// timer, threads count weighted safepoints so that a thread that rarely
/// allocates still escalates, and the cooldown lets such an escalation
/// trigger once enough time has passed.
#[derive(Debug)]
pub struct TimerlessPolicy {
    state: PolicyState,
}

impl TimerlessPolicy {
    /// Creates a timer-less policy with the allocation-or-cooldown rule.
    pub fn new(config: Arc<SchedulerConfig>, clock: Arc<dyn Clock>) -> Self {
        Self::with_rule(config, clock, EscalationRule::default_for(PolicyKind::Timerless))
    }

    /// Creates a timer-less policy with an explicit escalation rule.
    pub fn with_rule(config: Arc<SchedulerConfig>, clock: Arc<dyn Clock>, rule: EscalationRule) -> Self {
        TimerlessPolicy {
            state: PolicyState::new(config, clock, rule),
        }
    }
}

impl SchedulingPolicy for TimerlessPolicy {
    fn on_safepoint_escalation(&self, thread: &ThreadLocalAccumulator) {
        self.state.escalate(thread);
    }

    fn on_collection_finished(&self) {
        self.state.collection_finished();
    }

    fn set_schedule_callback(&self, callback: ScheduleCallback) {
        self.state.set_callback(callback);
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Timerless
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
