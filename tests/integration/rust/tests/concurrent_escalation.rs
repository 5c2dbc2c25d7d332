//! Concurrent Escalation Integration Tests
//!
//! Many mutator threads share one scheduler. Each thread owns its
//! accumulator; only threshold crossings reach the shared policy, and every
//! one of them must be delivered to the collector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use gc_scheduler::{ManualClock, Scheduler, SchedulerOptions, SchedulerSettings, SchedulingPolicy};
use integration_tests::FakeCollector;

const THREADS: usize = 8;

fn settings(allocation_threshold_bytes: usize) -> SchedulerSettings {
    SchedulerSettings {
        allocation_threshold_bytes: Some(allocation_threshold_bytes),
        cooldown_threshold_ns: Some(u64::MAX),
        // An hour: the timer never fires during these tests
        regular_interval_us: Some(3_600_000_000),
        ..SchedulerSettings::default()
    }
}

/// Test: every crossing from every thread reaches the collector (timer-less)
#[test]
fn test_no_escalation_dropped_timerless() {
    let clock = Arc::new(ManualClock::new(0));
    let scheduler = Scheduler::with_clock(
        SchedulerOptions::timerless().with_settings(settings(1000)),
        clock,
    );
    let collector = FakeCollector::attach(&scheduler);

    const CROSSINGS_PER_THREAD: usize = 500;
    let barrier = Barrier::new(THREADS);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let mut mutator = scheduler.new_thread_accumulator();
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                for _ in 0..CROSSINGS_PER_THREAD {
                    mutator.record_allocation(1200);
                }
            });
        }
    });

    assert_eq!(collector.requests(), THREADS * CROSSINGS_PER_THREAD);
}

/// Test: same property with the timer-backed policy
#[test]
fn test_no_escalation_dropped_with_timer() {
    let scheduler = Scheduler::new(SchedulerOptions::default().with_settings(settings(1000)));
    let collector = FakeCollector::attach(&scheduler);

    const CROSSINGS_PER_THREAD: usize = 200;

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let mut mutator = scheduler.new_thread_accumulator();
            scope.spawn(move || {
                for _ in 0..CROSSINGS_PER_THREAD {
                    // Four allocations per crossing: 4 * 300 = 1200 > 1000
                    for _ in 0..4 {
                        mutator.record_allocation(300);
                    }
                }
            });
        }
    });

    assert_eq!(collector.requests(), THREADS * CROSSINGS_PER_THREAD);
}

/// Test: sub-threshold allocation never touches the policy
#[test]
fn test_sub_threshold_allocation_stays_local() {
    let clock = Arc::new(ManualClock::new(0));
    let scheduler = Scheduler::with_clock(
        SchedulerOptions::timerless().with_settings(settings(1_000_000)),
        clock,
    );
    let collector = FakeCollector::attach(&scheduler);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let mut mutator = scheduler.new_thread_accumulator();
            scope.spawn(move || {
                for _ in 0..999 {
                    mutator.record_allocation(1000);
                }
                assert_eq!(mutator.allocated_bytes(), 999_000);
            });
        }
    });

    assert_eq!(collector.requests(), 0);
}

/// Test: aggressive mode drives collections from safepoints on every thread
#[test]
fn test_aggressive_safepoints_from_many_threads() {
    let clock = Arc::new(ManualClock::new(0));
    let options = SchedulerOptions::aggressive().with_settings(SchedulerSettings {
        safepoint_count_threshold: Some(10),
        ..SchedulerSettings::default()
    });
    let scheduler = Scheduler::with_clock(options, clock);
    let collector = FakeCollector::attach(&scheduler);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let mut mutator = scheduler.new_thread_accumulator();
            scope.spawn(move || {
                for _ in 0..1000 {
                    mutator.record_safepoint(1);
                }
            });
        }
    });

    // Cooldown is zero in aggressive mode, so each of the 100 crossings per thread collects
    assert_eq!(collector.requests(), THREADS * 100);
}

/// Test: timer ticks and mutator escalations are both delivered
#[test]
fn test_timer_and_escalations_both_delivered() {
    let options = SchedulerOptions::default().with_settings(SchedulerSettings {
        allocation_threshold_bytes: Some(1000),
        regular_interval_us: Some(1_000),
        ..SchedulerSettings::default()
    });
    let scheduler = Scheduler::new(options);

    let ticks_and_escalations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks_and_escalations);
    scheduler.policy().set_schedule_callback(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    // Let the timer fire a few times on its own
    let deadline = Instant::now() + Duration::from_secs(5);
    while ticks_and_escalations.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    let from_timer = ticks_and_escalations.load(Ordering::SeqCst);
    assert!(from_timer >= 3);

    let mut mutator = scheduler.new_thread_accumulator();
    for _ in 0..10 {
        mutator.record_allocation(2000);
    }
    assert!(ticks_and_escalations.load(Ordering::SeqCst) >= from_timer + 10);
}
