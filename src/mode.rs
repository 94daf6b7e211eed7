//! Manual/path mode transitions.

use crate::context::Context;
use crate::protocol::{OutboundMessage, RobotMode};
use log::{info, warn};

/// Buzz once on every accepted mode change.
const MODE_BUZZ: &str = "ZZ01";

pub struct ModeController {
    ctx: Context,
}

impl ModeController {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Switch to `mode`. Returns `false` when the robot was already in it.
    pub fn transition(&self, mode: RobotMode) -> bool {
        let shared = &self.ctx.shared;

        if shared.mode() == mode {
            let text = format!("Robot already in {} mode.", mode.title());
            warn!("{}", text);
            shared.notify(OutboundMessage::error(text));
            return false;
        }

        shared.set_mode(mode);
        let (commands, waypoints) = shared.commands.clear();
        if commands > 0 || waypoints > 0 {
            info!("Dropped {} queued commands and {} waypoints", commands, waypoints);
        }

        match mode {
            RobotMode::Manual => shared.unpause.raise(),
            RobotMode::Path => shared.unpause.lower(),
        }
        shared.release_motion();

        let text = format!("Robot is now in {} mode.", mode.title());
        info!("{}", text);
        shared.notify(OutboundMessage::info(text));

        self.ctx.signal_controller(MODE_BUZZ);
        true
    }

    /// Transition from an operator-supplied mode string.
    pub fn transition_named(&self, name: &str) -> bool {
        match name.parse::<RobotMode>() {
            Ok(mode) => self.transition(mode),
            Err(e) => {
                warn!("{}", e);
                self.ctx
                    .shared
                    .notify(OutboundMessage::error(format!("Unknown mode '{}'.", name)));
                false
            }
        }
    }
}
