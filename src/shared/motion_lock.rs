//! Motion lock: one movement command in flight to the controller.
//!
//! The command sequencer acquires the lock before transmitting. It is released
//! by the acknowledgement listener, by commands that never reach the controller
//! (no-op, end-of-path, snapshots), or best-effort by a mode change.
//!
//! Unlike a mutex guard, acquire and release happen on different threads, so the
//! lock is a binary semaphore rather than a `Mutex<()>`.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct MotionLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl MotionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is free, then take it.
    pub fn acquire(&self) {
        let mut held = self.held.lock();
        while *held {
            self.released.wait(&mut held);
        }
        *held = true;
    }

    /// Take the lock if it frees up within `timeout`.
    pub fn try_acquire_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock();
        while *held {
            if self.released.wait_until(&mut held, deadline).timed_out() && *held {
                return false;
            }
        }
        *held = true;
        true
    }

    /// Release the lock.
    ///
    /// Returns `false` when the lock was not held. Double release is not an
    /// error; callers log it and carry on.
    pub fn release(&self) -> bool {
        let mut held = self.held.lock();
        if !*held {
            return false;
        }
        *held = false;
        self.released.notify_one();
        true
    }

    pub fn is_held(&self) -> bool {
        *self.held.lock()
    }
}
