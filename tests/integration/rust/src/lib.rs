//! Integration test suite for the GC scheduler
//!
//! This crate provides end-to-end tests that drive a [`Scheduler`] from many
//! mutator threads against a stand-in collector.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use gc_scheduler::{Scheduler, SchedulingPolicy, ThreadLocalAccumulator};

/// Re-export components for test convenience
pub mod components {
    pub use gc_scheduler;
}

/// Collector double that records trigger requests and coalesces them.
///
/// Triggers may arrive concurrently from any mutator thread or the timer.
/// Like a real collector, it keeps at most one collection pending.
#[derive(Debug, Default)]
pub struct FakeCollector {
    /// Every trigger invocation, coalesced or not
    requests: AtomicUsize,
    /// Set by a trigger, cleared when a collection runs
    pending: AtomicBool,
    /// Collections actually performed
    completed: AtomicUsize,
}

impl FakeCollector {
    /// Creates a collector and registers its trigger with `scheduler`.
    pub fn attach(scheduler: &Scheduler) -> Arc<Self> {
        let collector = Arc::new(FakeCollector::default());
        let handle = Arc::clone(&collector);
        scheduler.policy().set_schedule_callback(Arc::new(move || {
            handle.requests.fetch_add(1, Ordering::SeqCst);
            handle.pending.store(true, Ordering::Release);
        }));
        collector
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Runs a collection if one was requested.
    ///
    /// Reports completion to the policy and resets every mutator's counters,
    /// the way a stop-the-world collector resumes its threads.
    pub fn collect_if_pending(
        &self,
        scheduler: &Scheduler,
        mutators: &mut [ThreadLocalAccumulator],
    ) -> bool {
        if !self.pending.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        scheduler.policy().on_collection_finished();
        for mutator in mutators.iter_mut() {
            mutator.on_collection_finished();
        }
        true
    }
}
