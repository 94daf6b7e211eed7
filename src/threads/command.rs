//! Command sequencer: moves queued commands to the controller one at a time.
//!
//! Loop: wait for the unpause gate, take the next command, acquire the motion
//! lock, dispatch. Controller-bound commands keep the lock until the
//! acknowledgement listener sees `ACK`; internal markers release it themselves
//! or hand it to the action dispatcher.

use crate::context::Context;
use crate::error::Result;
use crate::protocol::command::MANUAL_SNAP_OBSTACLE;
use crate::protocol::{Action, CommandKind, MovementCommand, OutboundMessage, Waypoint};
use log::{debug, error, info};
use std::time::Duration;

/// Bound on every blocking wait so shutdown is noticed.
const POLL: Duration = Duration::from_millis(500);

/// Signal used when a snapshot token carries none.
const DEFAULT_SIGNAL: &str = "C";

pub struct CommandSequencer {
    ctx: Context,
}

impl CommandSequencer {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Run until shutdown. An unknown command ends the loop with an error.
    pub fn run(&self) -> Result<()> {
        let shared = &self.ctx.shared;
        info!("Command sequencer started");

        while !shared.should_shutdown() {
            if !shared.unpause.wait_for_timeout(true, POLL) {
                continue;
            }
            let Some((command, waypoint)) = shared.commands.pop_timeout(POLL) else {
                continue;
            };

            while !shared.motion_lock.try_acquire_for(POLL) {
                if shared.should_shutdown() {
                    return Ok(());
                }
            }

            self.dispatch(&command, waypoint)?;
        }

        info!("Command sequencer stopped");
        Ok(())
    }

    /// Act on one command. The motion lock must already be held.
    ///
    /// A controller-bound command parks its waypoint for the acknowledgement;
    /// an internal marker consumes its waypoint unreported.
    pub fn dispatch(&self, command: &MovementCommand, waypoint: Option<Waypoint>) -> Result<()> {
        let shared = &self.ctx.shared;

        let kind = match command.kind() {
            Ok(kind) => kind,
            Err(e) => {
                error!("{}", e);
                shared.release_motion();
                return Err(e);
            }
        };

        if !kind.is_transmitted() && waypoint.is_some() {
            debug!("Dropped waypoint of internal command {}", command);
        }

        match kind {
            CommandKind::Motion | CommandKind::Stop | CommandKind::Buzz | CommandKind::Diagnostic => {
                debug!("Sending {} to controller", command);
                shared.commands.set_in_flight(waypoint);
                if let Err(e) = self.ctx.controller.send(command.as_str()) {
                    // No ACK will come for a command that never left.
                    error!("Failed to send {}: {}", command, e);
                    shared.commands.set_in_flight(None);
                    shared.release_motion();
                }
            }
            CommandKind::Snap {
                obstacle_id,
                signal,
            } => {
                shared.post_action(Action::Snap {
                    obstacle_id,
                    signal: signal.unwrap_or_else(|| DEFAULT_SIGNAL.to_string()),
                });
            }
            CommandKind::ManualSnap => {
                shared.post_action(Action::Snap {
                    obstacle_id: MANUAL_SNAP_OBSTACLE.to_string(),
                    signal: DEFAULT_SIGNAL.to_string(),
                });
            }
            CommandKind::Noop => shared.release_motion(),
            CommandKind::FastestRunStart => {
                shared.notify(OutboundMessage::status("running"));
                shared.notify(OutboundMessage::info("Starting robot on fastest run!"));
                shared.release_motion();
            }
            CommandKind::Finish => {
                self.ctx.signal_controller("ZZ01");
                shared.unpause.lower();
                shared.release_motion();
                info!("Commands queue finished.");
                shared.notify(OutboundMessage::info("Commands queue finished."));
                shared.notify(OutboundMessage::status("finished"));
                shared.post_action(Action::Stitch);
            }
        }
        Ok(())
    }
}
