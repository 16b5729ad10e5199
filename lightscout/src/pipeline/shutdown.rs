//! Cooperative shutdown flag shared by the pipeline threads.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A one-way shutdown flag that wakes sleeping threads when raised.
///
/// Threads that would otherwise `thread::sleep` call [`wait`](Self::wait)
/// instead, so a stop request interrupts the sleep immediately.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake every waiter.
    pub fn trigger(&self) {
        let mut raised = self.raised.lock();
        *raised = true;
        self.cond.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.raised.lock()
    }

    /// Sleep for up to `timeout`, returning early if the flag is raised.
    ///
    /// Returns `true` when shutdown has been requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut raised = self.raised.lock();
        while !*raised {
            if self.cond.wait_until(&mut raised, deadline).timed_out() {
                break;
            }
        }
        *raised
    }
}
