//! Per-mutator-thread safepoint and allocation counters.
//!
//! Every safepoint and allocation goes through a [`ThreadLocalAccumulator`].
//! The fast path only touches the accumulator's own fields: counters are
//! compared against threshold snapshots taken at the last reset, and the
//! shared policy is consulted only when a threshold is crossed.

use std::fmt;
use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::policy::SchedulingPolicy;

/// Safepoint weights for the kinds of safepoints emitted by generated code.
pub struct SafepointWeight;

impl SafepointWeight {
    /// Function epilogue
    pub const FUNCTION_EPILOGUE: usize = 1;
    /// Loop back-edge
    pub const LOOP_BODY: usize = 1;
    /// Exception unwinding
    pub const EXCEPTION_UNWIND: usize = 1;
}

/// Counters owned by a single mutator thread.
///
/// Created through [`Scheduler::new_thread_accumulator`](crate::Scheduler::new_thread_accumulator)
/// when a thread attaches, and dropped when it detaches. All methods take
/// `&mut self`; the accumulator is never shared between threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use gc_scheduler::{Scheduler, SchedulerOptions};
///
/// let scheduler = Scheduler::new(SchedulerOptions::timerless());
/// scheduler.config().set_allocation_threshold_bytes(1000);
///
/// let collections = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&collections);
/// scheduler.policy().set_schedule_callback(Arc::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// let mut thread = scheduler.new_thread_accumulator();
/// thread.record_allocation(1200);
/// assert_eq!(collections.load(Ordering::SeqCst), 1);
/// assert_eq!(thread.allocated_bytes(), 0);
/// ```
pub struct ThreadLocalAccumulator {
    config: Arc<SchedulerConfig>,
    policy: Arc<dyn SchedulingPolicy>,
    /// Fixed at creation from the policy kind
    counts_safepoints: bool,

    allocated_bytes: usize,
    allocated_bytes_threshold: usize,
    safepoint_weight: usize,
    safepoint_weight_threshold: usize,
}

impl ThreadLocalAccumulator {
    /// Creates an accumulator with zeroed counters and fresh thresholds.
    pub fn new(config: Arc<SchedulerConfig>, policy: Arc<dyn SchedulingPolicy>) -> Self {
        let counts_safepoints = policy.counts_safepoints();
        let mut accumulator = ThreadLocalAccumulator {
            config,
            policy,
            counts_safepoints,
            allocated_bytes: 0,
            allocated_bytes_threshold: 0,
            safepoint_weight: 0,
            safepoint_weight_threshold: 0,
        };
        accumulator.clear_counters_and_update_thresholds();
        accumulator
    }

    /// Should be called on every safepoint emitted by generated code.
    ///
    /// Does nothing unless the policy relies on safepoint counts.
    #[inline]
    pub fn record_safepoint(&mut self, weight: usize) {
        if !self.counts_safepoints {
            return;
        }
        self.safepoint_weight += weight;
        if self.safepoint_weight < self.safepoint_weight_threshold {
            return;
        }
        self.escalate();
    }

    /// Should be called by the allocator for every allocation of `size` bytes.
    #[inline]
    pub fn record_allocation(&mut self, size: usize) {
        self.allocated_bytes = self.allocated_bytes.saturating_add(size);
        if self.allocated_bytes < self.allocated_bytes_threshold {
            return;
        }
        self.escalate();
    }

    /// Called on this thread once mutators resume after a collection.
    pub fn on_collection_finished(&mut self) {
        self.clear_counters_and_update_thresholds();
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    pub fn safepoint_weight(&self) -> usize {
        self.safepoint_weight
    }

    pub fn allocated_bytes_threshold(&self) -> usize {
        self.allocated_bytes_threshold
    }

    pub fn safepoint_weight_threshold(&self) -> usize {
        self.safepoint_weight_threshold
    }

    /// Whether [`record_safepoint`](Self::record_safepoint) counts anything.
    pub fn counts_safepoints(&self) -> bool {
        self.counts_safepoints
    }

    #[cold]
    #[inline(never)]
    fn escalate(&mut self) {
        self.policy.on_safepoint_escalation(self);
        self.clear_counters_and_update_thresholds();
    }

    fn clear_counters_and_update_thresholds(&mut self) {
        self.allocated_bytes = 0;
        self.safepoint_weight = 0;

        self.allocated_bytes_threshold = self.config.allocation_threshold_bytes();
        self.safepoint_weight_threshold = self.config.safepoint_count_threshold();
    }
}

impl fmt::Debug for ThreadLocalAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadLocalAccumulator")
            .field("allocated_bytes", &self.allocated_bytes)
            .field("allocated_bytes_threshold", &self.allocated_bytes_threshold)
            .field("safepoint_weight", &self.safepoint_weight)
            .field("safepoint_weight_threshold", &self.safepoint_weight_threshold)
            .field("counts_safepoints", &self.counts_safepoints)
            .finish()
    }
}
