//! Boolean flag with change notification.
//!
//! Used for every "block until something changes" point in the coordinator:
//! debounced sensor flags, the unpause gate and the operator-dropped event.
//! Waiters park on a condition variable instead of spinning on the value.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A boolean that threads can wait on.
#[derive(Debug)]
pub struct Flag {
    value: Mutex<bool>,
    changed: Condvar,
}

impl Flag {
    pub fn new(initial: bool) -> Self {
        Self {
            value: Mutex::new(initial),
            changed: Condvar::new(),
        }
    }

    /// Current value.
    pub fn get(&self) -> bool {
        *self.value.lock()
    }

    /// Store a value, waking waiters if it changed. Returns the previous value.
    pub fn set(&self, value: bool) -> bool {
        let mut guard = self.value.lock();
        let previous = *guard;
        if previous != value {
            *guard = value;
            self.changed.notify_all();
        }
        previous
    }

    pub fn raise(&self) {
        self.set(true);
    }

    pub fn lower(&self) {
        self.set(false);
    }

    /// Block until the flag holds `value` or `timeout` elapses.
    ///
    /// Returns `true` if the value was observed.
    pub fn wait_for_timeout(&self, value: bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.value.lock();
        while *guard != value {
            if self.changed.wait_until(&mut guard, deadline).timed_out() {
                return *guard == value;
            }
        }
        true
    }
}

impl Default for Flag {
    fn default() -> Self {
        Self::new(false)
    }
}
