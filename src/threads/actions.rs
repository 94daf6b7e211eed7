//! Action dispatcher: the single consumer of the action queue.
//!
//! Everything slow or network-bound runs here so the operator receiver and
//! the command sequencer never block on HTTP or the camera.

use crate::context::Context;
use crate::mode::ModeController;
use crate::protocol::{Action, MovementCommand, OutboundMessage, Waypoint};
use crate::services::{PathRequest, image_filename};
use crossbeam_channel::RecvTimeoutError;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::time::Duration;

const POLL: Duration = Duration::from_millis(500);

/// Faces photographed by the single-obstacle calibration path, in order.
const CALIBRATION_FACES: [&str; 3] = ["E", "N", "W"];

pub struct ActionDispatcher {
    ctx: Context,
    modes: ModeController,
}

impl ActionDispatcher {
    pub fn new(ctx: Context) -> Self {
        let modes = ModeController::new(ctx.clone());
        Self { ctx, modes }
    }

    pub fn run(&self) {
        info!("Action dispatcher started");
        let actions = self.ctx.shared.actions();

        while !self.ctx.shared.should_shutdown() {
            match actions.recv_timeout(POLL) {
                Ok(action) => self.handle(action),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("Action dispatcher stopped");
    }

    pub fn handle(&self, action: Action) {
        debug!("Action: {:?}", action);
        match action {
            Action::Mode(name) => {
                self.modes.transition_named(&name);
            }
            Action::SingleObstacle => self.load_single_obstacle(),
            Action::Obstacles(obstacles) => self.plan_path(obstacles),
            Action::Snap {
                obstacle_id,
                signal,
            } => self.snap(&obstacle_id, &signal),
            Action::Stitch => self.stitch(),
        }
    }

    fn prepare(&self, command: MovementCommand) -> MovementCommand {
        if self.ctx.config.robot.outdoor {
            command.outdoorsified()
        } else {
            command
        }
    }

    fn load_single_obstacle(&self) {
        let shared = &self.ctx.shared;
        shared.commands.clear();

        let placeholder = Waypoint::new(1, 1, 0, -1);
        for command in calibration_path() {
            shared.commands.push_planned(self.prepare(command), placeholder);
        }

        info!("Single obstacle path loaded ({} commands)", shared.commands.len());
        shared.notify(OutboundMessage::info(
            "Navigate-around-obstacle path loaded. Robot is ready to move.",
        ));
    }

    fn plan_path(&self, obstacles: Value) {
        let shared = &self.ctx.shared;
        let request = PathRequest::from_start(obstacles, false);

        let planned = match self.ctx.planner.plan(&request) {
            Ok(planned) => planned,
            Err(e) => {
                error!("Path planning failed: {}", e);
                shared.notify(OutboundMessage::error(
                    "Something went wrong when requesting path from the API.",
                ));
                self.ctx.signal_controller("ZZ04");
                return;
            }
        };

        if planned.path.len() != planned.commands.len() + 1 {
            warn!(
                "Planned path has {} poses for {} commands",
                planned.path.len(),
                planned.commands.len()
            );
        }

        shared.commands.clear();
        // path[0] is the start pose; each command leads to the next one.
        let mut poses = planned.path.iter().skip(1);
        for token in planned.commands {
            let command = self.prepare(MovementCommand::new(token));
            match poses.next() {
                Some(waypoint) => shared.commands.push_planned(command, *waypoint),
                None => shared.commands.push(command),
            }
        }

        info!("Loaded planned path ({} commands)", shared.commands.len());
        shared.notify(OutboundMessage::info(
            "Commands and path received from the API. Robot is ready to move.",
        ));
    }

    fn snap(&self, obstacle_id: &str, signal: &str) {
        let shared = &self.ctx.shared;
        let filename = image_filename(obstacle_id, signal);

        let result = self
            .ctx
            .camera
            .capture_jpeg()
            .and_then(|jpeg| self.ctx.vision.classify(&filename, jpeg));

        match result {
            Ok(classification) => {
                info!(
                    "Obstacle {} recognised as image {}",
                    classification.obstacle_id, classification.image_id
                );
                shared.notify(OutboundMessage::image_rec(
                    &classification.image_id,
                    &classification.obstacle_id,
                ));
            }
            Err(e) => {
                error!("Image recognition for obstacle {} failed: {}", obstacle_id, e);
                shared.notify(OutboundMessage::error(
                    "Something went wrong when requesting image recognition from the API.",
                ));
            }
        }

        shared.release_motion();
    }

    fn stitch(&self) {
        match self.ctx.vision.stitch() {
            Ok(()) => {
                info!("Images stitched");
                self.ctx
                    .shared
                    .notify(OutboundMessage::info("Images stitched!"));
            }
            Err(e) => {
                error!("Stitch request failed: {}", e);
                self.ctx.shared.notify(OutboundMessage::error(
                    "Something went wrong when requesting stitch from the API.",
                ));
            }
        }
    }
}

/// Drive around a single obstacle, photographing three of its faces.
fn calibration_path() -> Vec<MovementCommand> {
    let mut path = vec![
        MovementCommand::new("DT20"),
        MovementCommand::new("SNAPS"),
        MovementCommand::noop(),
    ];
    for face in CALIBRATION_FACES {
        path.extend(
            ["FR00", "FL00", "FW30", "BR00", "FW10"]
                .into_iter()
                .map(MovementCommand::new),
        );
        path.push(MovementCommand::new(format!("SNAP{}", face)));
        path.push(MovementCommand::noop());
    }
    path.push(MovementCommand::finish());
    path
}
