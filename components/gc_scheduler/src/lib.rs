//! GC Scheduler - decides when a garbage collection cycle should run
//!
//! This component provides:
//! - Shared, lock-free tunables ([`SchedulerConfig`]) loadable from JSON or
//!   the environment ([`SchedulerSettings`])
//! - Per-mutator-thread safepoint and allocation accounting
//!   ([`ThreadLocalAccumulator`]) with a near-free fast path
//! - Global triggering policies: timer-backed ([`TimerPolicy`]) and
//!   escalation-only ([`TimerlessPolicy`])
//! - A composition root ([`Scheduler`]) wiring them together
//!
//! The collector itself is external. It registers a single trigger with
//! [`SchedulingPolicy::set_schedule_callback`] and reports every completed
//! cycle through [`SchedulingPolicy::on_collection_finished`].

pub mod accumulator;
pub mod clock;
pub mod config;
pub mod error;
pub mod policy;
pub mod scheduler;
pub mod settings;
pub mod timer;

// Re-export main types
pub use accumulator::{SafepointWeight, ThreadLocalAccumulator};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::SchedulerConfig;
pub use error::{ConfigError, ConfigResult};
pub use policy::{
    make_policy, EscalationRule, PolicyKind, ScheduleCallback, SchedulingPolicy, TimerPolicy,
    TimerlessPolicy,
};
pub use scheduler::{Scheduler, SchedulerOptions};
pub use settings::SchedulerSettings;
pub use timer::RepeatedTimer;
