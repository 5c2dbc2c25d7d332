//! Scoped repeating timer backed by a dedicated thread.
//!
//! The timer thread sleeps on a channel with a timeout. A timeout means the
//! period elapsed and the tick closure runs; the closure returns the period
//! to wait before the next tick. Dropping the [`RepeatedTimer`] disconnects
//! the channel, which wakes the thread immediately, and then joins it.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};

/// Name given to the timer thread.
pub const TIMER_THREAD_NAME: &str = "gc-scheduler-timer";

/// A repeating timer whose lifetime bounds its background thread.
pub struct RepeatedTimer {
    /// Dropping this sender stops the thread
    stop: Option<Sender<()>>,
    /// Handle to the timer thread
    handle: Option<JoinHandle<()>>,
}

impl RepeatedTimer {
    /// Starts a timer that first fires after `interval`.
    ///
    /// `tick` runs on the timer thread and returns the delay until the next
    /// tick, so the period may change while the timer is running.
    ///
    /// # Panics
    ///
    /// Panics if the timer thread cannot be spawned.
    pub fn new<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Duration + Send + 'static,
    {
        let (stop, stopped) = channel::bounded::<()>(0);

        let handle = thread::Builder::new()
            .name(TIMER_THREAD_NAME.into())
            .spawn(move || {
                let mut interval = interval;
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => interval = tick(),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .expect("Failed to spawn GC scheduler timer thread");

        RepeatedTimer {
            stop: Some(stop),
            handle: Some(handle),
        }
    }
}

impl Drop for RepeatedTimer {
    fn drop(&mut self) {
        drop(self.stop.take());

        if let Some(handle) = self.handle.take() {
            // The owner may be released from inside a tick; joining there
            // would wait on ourselves.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for RepeatedTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepeatedTimer")
            .field("running", &self.handle.is_some())
            .finish()
    }
}
