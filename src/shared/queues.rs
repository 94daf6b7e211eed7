//! Movement command queue with the planned pose of each command.
//!
//! A planned command and its waypoint are stored as one entry, so they are
//! always dequeued together. The waypoint of the command currently on the
//! controller is parked in an in-flight slot until its acknowledgement.
//! Everything sits behind one mutex so a mode change drains it all at once.

use crate::protocol::{MovementCommand, Waypoint};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A queued command and the pose reached once it completes, if planned.
pub type Planned = (MovementCommand, Option<Waypoint>);

#[derive(Debug, Default)]
struct Queues {
    pending: VecDeque<Planned>,
    in_flight: Option<Waypoint>,
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    inner: Mutex<Queues>,
    available: Condvar,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command with no planned pose.
    pub fn push(&self, command: MovementCommand) {
        let mut queues = self.inner.lock();
        queues.pending.push_back((command, None));
        self.available.notify_one();
    }

    /// Append a command together with the pose reached once it completes.
    pub fn push_planned(&self, command: MovementCommand, waypoint: Waypoint) {
        let mut queues = self.inner.lock();
        queues.pending.push_back((command, Some(waypoint)));
        self.available.notify_one();
    }

    /// Append many commands under a single lock.
    pub fn extend<I>(&self, commands: I)
    where
        I: IntoIterator<Item = MovementCommand>,
    {
        let mut queues = self.inner.lock();
        queues
            .pending
            .extend(commands.into_iter().map(|command| (command, None)));
        self.available.notify_all();
    }

    /// Wait up to `timeout` for the next command and its waypoint.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Planned> {
        let deadline = Instant::now() + timeout;
        let mut queues = self.inner.lock();
        loop {
            if let Some(entry) = queues.pending.pop_front() {
                return Some(entry);
            }
            if self.available.wait_until(&mut queues, deadline).timed_out() {
                return queues.pending.pop_front();
            }
        }
    }

    /// Park the waypoint of the command just sent to the controller.
    pub fn set_in_flight(&self, waypoint: Option<Waypoint>) {
        self.inner.lock().in_flight = waypoint;
    }

    /// Waypoint of the acknowledged command, if it had one. Never blocks.
    pub fn take_in_flight(&self) -> Option<Waypoint> {
        self.inner.lock().in_flight.take()
    }

    /// Drop everything, in-flight waypoint included.
    ///
    /// Returns `(commands, waypoints)` removed.
    pub fn clear(&self) -> (usize, usize) {
        let mut queues = self.inner.lock();
        let waypoints = queues.pending.iter().filter(|(_, w)| w.is_some()).count()
            + usize::from(queues.in_flight.is_some());
        let removed = (queues.pending.len(), waypoints);
        queues.pending.clear();
        queues.in_flight = None;
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().pending.is_empty()
    }

    /// Waypoints still to be reported, in flight included.
    pub fn waypoint_len(&self) -> usize {
        let queues = self.inner.lock();
        queues.pending.iter().filter(|(_, w)| w.is_some()).count()
            + usize::from(queues.in_flight.is_some())
    }

    /// Copy of the pending commands, front first.
    pub fn snapshot(&self) -> Vec<MovementCommand> {
        self.inner
            .lock()
            .pending
            .iter()
            .map(|(command, _)| command.clone())
            .collect()
    }
}
