//! State shared between every coordinator thread.

use super::{CommandQueue, Flag, MotionLock};
use crate::protocol::{Action, OutboundMessage, RobotMode};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::warn;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

/// Which proximity sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Operator link status as last observed by the operator tasks.
#[derive(Debug, Clone, Default)]
pub struct LinkHealth {
    pub connected: bool,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct SharedState {
    mode: AtomicU8,

    /// Pending movement commands and planned waypoints
    pub commands: CommandQueue,

    /// One command in flight to the controller
    pub motion_lock: MotionLock,

    /// Command sequencer runs only while raised
    pub unpause: Flag,

    /// Raised by an operator task when its side of the link fails
    pub operator_dropped: Flag,

    /// Debounced sensor flags, `true` = clear
    pub front_clear: Flag,
    pub long_clear: Flag,
    pub left_clear: Flag,
    pub right_clear: Flag,

    /// Last front distance reading in cm (f32 bits)
    last_distance: AtomicU32,

    outbound_tx: Sender<OutboundMessage>,
    outbound_rx: Receiver<OutboundMessage>,
    action_tx: Sender<Action>,
    action_rx: Receiver<Action>,

    pub link_health: Mutex<LinkHealth>,

    /// A fastest run thread is active
    pub fastest_run_active: AtomicBool,

    /// Shutdown signal for graceful termination
    shutdown: AtomicBool,
}

impl SharedState {
    /// Fresh state: manual mode, sequencer unpaused, every sensor clear.
    pub fn new() -> Self {
        let (outbound_tx, outbound_rx) = unbounded();
        let (action_tx, action_rx) = unbounded();
        Self {
            mode: AtomicU8::new(RobotMode::Manual as u8),
            commands: CommandQueue::new(),
            motion_lock: MotionLock::new(),
            unpause: Flag::new(true),
            operator_dropped: Flag::new(false),
            front_clear: Flag::new(true),
            long_clear: Flag::new(true),
            left_clear: Flag::new(true),
            right_clear: Flag::new(true),
            last_distance: AtomicU32::new(f32::MAX.to_bits()),
            outbound_tx,
            outbound_rx,
            action_tx,
            action_rx,
            link_health: Mutex::new(LinkHealth::default()),
            fastest_run_active: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> RobotMode {
        RobotMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn set_mode(&self, mode: RobotMode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    /// Queue a message for the operator.
    pub fn notify(&self, message: OutboundMessage) {
        // Both channel ends live here, so send only fails after teardown.
        if self.outbound_tx.send(message).is_err() {
            warn!("Outbound queue closed, message dropped");
        }
    }

    pub fn outbound(&self) -> &Receiver<OutboundMessage> {
        &self.outbound_rx
    }

    pub fn post_action(&self, action: Action) {
        if self.action_tx.send(action).is_err() {
            warn!("Action queue closed, action dropped");
        }
    }

    pub fn actions(&self) -> &Receiver<Action> {
        &self.action_rx
    }

    pub fn last_distance(&self) -> f32 {
        f32::from_bits(self.last_distance.load(Ordering::Acquire))
    }

    pub fn set_last_distance(&self, cm: f32) {
        self.last_distance.store(cm.to_bits(), Ordering::Release);
    }

    /// Proximity flag for one side.
    pub fn proximity(&self, side: Side) -> &Flag {
        match side {
            Side::Left => &self.left_clear,
            Side::Right => &self.right_clear,
        }
    }

    /// Release the motion lock, logging a release of an unheld lock.
    pub fn release_motion(&self) {
        if !self.motion_lock.release() {
            warn!("Tried to release a released lock!");
        }
    }

    pub fn record_link_error(&self, error: impl ToString) {
        let mut health = self.link_health.lock();
        health.connected = false;
        health.last_error = Some(error.to_string());
    }

    pub fn record_link_connected(&self) {
        let mut health = self.link_health.lock();
        health.connected = true;
        health.last_error = None;
    }

    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        // Wake the supervisor so it notices promptly.
        self.operator_dropped.raise();
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
