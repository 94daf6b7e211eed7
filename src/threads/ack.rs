//! Controller acknowledgement listener.

use crate::context::Context;
use crate::protocol::{OutboundMessage, RobotMode};
use log::{debug, info, warn};
use std::thread;
use std::time::Duration;

/// Pause before retrying after a controller read error.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Acknowledgement sent when the controller finishes a fastest run.
const FASTEST_RUN_ACK: &str = "ACK|X";

pub struct AckListener {
    ctx: Context,
}

impl AckListener {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn run(&self) {
        info!("Controller listener started");
        while !self.ctx.shared.should_shutdown() {
            match self.ctx.controller.recv() {
                Ok(message) => self.handle(&message),
                Err(e) => {
                    warn!("Controller receive failed: {}", e);
                    thread::sleep(RETRY_DELAY);
                }
            }
        }
        info!("Controller listener stopped");
    }

    /// Process one line from the controller.
    pub fn handle(&self, message: &str) {
        let shared = &self.ctx.shared;

        if !message.starts_with("ACK") {
            warn!("Ignored unknown message from controller: {}", message);
            return;
        }

        // Take the pose before releasing: the sequencer parks the next one
        // as soon as it holds the lock again.
        let waypoint = shared.commands.take_in_flight();

        if !shared.motion_lock.release() {
            warn!("Tried to release a released lock!");
        } else {
            debug!("ACK from controller received, motion lock released.");
        }

        match shared.mode() {
            RobotMode::Path => match waypoint {
                Some(waypoint) => shared.notify(OutboundMessage::location(&waypoint)),
                None => warn!("ACK in path mode with no planned waypoint"),
            },
            RobotMode::Manual => {
                if message == FASTEST_RUN_ACK {
                    info!("Fastest run ACK received from controller!");
                    shared.notify(OutboundMessage::info("Robot has completed fastest run!"));
                    shared.notify(OutboundMessage::status("finished"));
                }
            }
        }
    }
}
