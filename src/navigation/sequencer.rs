//! Fastest run sequencer.
//!
//! Drives the two-obstacle course by feeding the command queue. It never
//! waits for acknowledgements; the only inputs are the sensor flags, the
//! last front distance and the two marker classifications.
//!
//! ```text
//! approach -> classify #1 -> obstacle_one -> measure gap
//!          -> approach -> classify #2 -> obstacle_two -> return_home -> ZZ02
//! ```

use super::maneuver::{Step, mirror};
use super::state::{Branch, NavigationState};
use crate::config::NavigationConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::protocol::{MovementCommand, OutboundMessage, forward_chunks};
use crate::services::image_filename;
use crate::shared::Side;
use log::{debug, error, info, warn};
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep; shutdown is checked between slices.
const PAUSE_SLICE: Duration = Duration::from_millis(500);

/// Signal recorded with fastest run captures.
const CAPTURE_SIGNAL: &str = "C";

pub struct NavigationSequencer {
    ctx: Context,
    nav: NavigationConfig,
    state: NavigationState,
}

/// Clears the single-run guard when the run thread exits.
struct RunGuard(Context);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.shared.fastest_run_active.store(false, Ordering::Release);
    }
}

impl NavigationSequencer {
    pub fn new(ctx: Context) -> Self {
        let nav = ctx.config.navigation.clone();
        Self {
            ctx,
            nav,
            state: NavigationState::default(),
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Start a run on its own thread.
    ///
    /// Returns `Ok(None)` when a run is already active.
    pub fn launch(ctx: Context) -> Result<Option<JoinHandle<()>>> {
        if ctx
            .shared
            .fastest_run_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }

        // A failed spawn drops the closure, and the guard with it.
        let guard = RunGuard(ctx);
        let handle = thread::Builder::new()
            .name("fastest-run".into())
            .spawn(move || {
                let mut sequencer = NavigationSequencer::new(guard.0.clone());
                if let Err(e) = sequencer.run() {
                    error!("Fastest run aborted: {}", e);
                }
                drop(guard);
            })?;
        Ok(Some(handle))
    }

    /// Run the whole course.
    pub fn run(&mut self) -> Result<()> {
        info!("Starting fastest run");

        // Obstacle 1
        self.approach()?;
        self.pause(self.nav.approach_settle_ms)?;
        let first = self.classify(1);
        self.state.first = Some(first.clone());
        let script = self.nav.course.obstacle_one.clone();
        self.run_maneuver(&script, &first)?;

        // Between the obstacles
        self.pause(self.nav.clear_settle_ms)?;
        self.measure_gap()?;

        // Obstacle 2
        self.approach()?;
        let second = self.classify(2);
        self.state.second = Some(second.clone());
        let script = self.nav.course.obstacle_two.clone();
        self.run_maneuver(&script, &second)?;

        let script = self.nav.course.return_home.clone();
        self.run_maneuver(&script, &second)?;

        self.pause(self.nav.finish_settle_ms)?;
        self.ctx.shared.commands.push(MovementCommand::buzz(2));

        info!(
            "Fastest run sequence complete (lateral {} cm, gap {} cm, forward {:.1} s)",
            self.state.lateral_cm, self.state.gap_cm, self.state.forward_secs
        );
        Ok(())
    }

    /// Drive at the obstacle ahead and stop when the front flag blocks.
    pub fn approach(&mut self) -> Result<()> {
        self.drive_until_blocked(true)
    }

    fn drive_until_blocked(&mut self, clear_first: bool) -> Result<()> {
        let shared = &self.ctx.shared;

        if shared.front_clear.get() {
            debug!("Front clear, driving until blocked");
            if clear_first {
                shared.commands.clear();
            }
            shared.commands.push(MovementCommand::forward_open_ended());
        }
        let started = Instant::now();

        while !shared.front_clear.wait_for_timeout(false, PAUSE_SLICE) {
            self.check_shutdown()?;
        }

        debug!("Front blocked, stopping");
        shared.commands.clear();
        shared.commands.push(MovementCommand::stop());
        self.state.forward_secs += started.elapsed().as_secs_f64();
        Ok(())
    }

    /// Capture and classify the marker in front of the robot.
    ///
    /// Any failure is reported to the operator and yields `Branch::Default`.
    pub fn classify(&self, obstacle: u8) -> Branch {
        let obstacle_id = obstacle.to_string();
        let result = self.ctx.camera.capture_jpeg().and_then(|jpeg| {
            let filename = image_filename(&obstacle_id, CAPTURE_SIGNAL);
            self.ctx.vision.classify(&filename, jpeg)
        });

        match result {
            Ok(classification) => {
                info!(
                    "Obstacle {} classified as {}",
                    obstacle, classification.image_id
                );
                Branch::from_image_id(&classification.image_id)
            }
            Err(e) => {
                error!("Classification of obstacle {} failed: {}", obstacle, e);
                self.ctx.shared.notify(OutboundMessage::error(format!(
                    "Image recognition failed for obstacle {}, taking the default route.",
                    obstacle
                )));
                Branch::Default(None)
            }
        }
    }

    /// Sample the front distance and store the gap to the second obstacle.
    pub fn measure_gap(&mut self) -> Result<u32> {
        let shared = std::sync::Arc::clone(&self.ctx.shared);
        let interval = self.nav.scaled(self.nav.gap_sample_interval_ms);
        let gap = self.sample_gap(|| {
            let cm = shared.last_distance();
            thread::sleep(interval);
            cm
        });
        self.check_shutdown()?;
        self.state.gap_cm = gap;
        info!("Gap between obstacles: {} cm", gap);
        Ok(gap)
    }

    /// Largest plausible sample plus the configured offset.
    ///
    /// Samples at or above the upper bound are discarded; with none left the
    /// fallback is used.
    pub fn sample_gap<F>(&self, mut read: F) -> u32
    where
        F: FnMut() -> f32,
    {
        let largest = (0..self.nav.gap_samples)
            .map(|_| read())
            .filter(|cm| *cm < self.nav.gap_upper_bound_cm)
            .map(|cm| cm.max(0.0) as u32)
            .max()
            .unwrap_or(self.nav.gap_fallback_cm as u32);
        largest + self.nav.gap_offset_cm as u32
    }

    /// Run a script, mirrored for the left-hand branch.
    pub fn run_maneuver(&mut self, steps: &[Step], branch: &Branch) -> Result<()> {
        if branch.is_left() {
            let mirrored = mirror(steps);
            self.run_steps(&mirrored)
        } else {
            self.run_steps(steps)
        }
    }

    fn run_steps(&mut self, steps: &[Step]) -> Result<()> {
        for step in steps {
            self.check_shutdown()?;
            self.execute(step)?;
        }
        Ok(())
    }

    fn execute(&mut self, step: &Step) -> Result<()> {
        let commands = &self.ctx.shared.commands;
        match step {
            Step::Send { command } => commands.push(command.clone()),
            Step::Clear => {
                commands.clear();
            }
            Step::Settle { ms } => self.pause(*ms)?,
            Step::Forward { distance } => {
                let cm = distance.resolve(self.state.lateral_cm, self.state.gap_cm);
                debug!("Forward {} cm ({:?})", cm, distance);
                commands.extend(forward_chunks(cm));
            }
            Step::PassObstacle { side, trailing } => self.pass_obstacle(*side, *trailing)?,
            Step::BackOffIfClose {
                command,
                below_cm,
                settle_ms,
            } => {
                let distance = self.ctx.shared.last_distance();
                if distance < *below_cm {
                    debug!("Too close at {:.1} cm, backing off", distance);
                    commands.push(command.clone());
                    self.pause(*settle_ms)?;
                }
            }
            Step::IfLongBlocked { steps } => {
                if self.ctx.shared.long_clear.get() {
                    debug!("Long-range clear, skipping correction");
                } else {
                    self.run_steps(steps)?;
                }
            }
            Step::DriveUntilBlocked => self.drive_until_blocked(false)?,
        }
        Ok(())
    }

    fn pass_obstacle(&mut self, side: Side, trailing: bool) -> Result<()> {
        let step_cm = self.nav.lateral_step_cm;
        while !self.ctx.shared.proximity(side).get() {
            self.check_shutdown()?;
            self.ctx.shared.commands.push(MovementCommand::forward(step_cm));
            self.state.lateral_cm += step_cm;
            self.pause(self.nav.pass_step_ms)?;
        }
        if trailing {
            self.ctx.shared.commands.push(MovementCommand::forward(step_cm));
            self.state.lateral_cm += step_cm;
        }
        debug!("Passed obstacle on {:?}, lateral {} cm", side, self.state.lateral_cm);
        Ok(())
    }

    fn pause(&self, ms: u64) -> Result<()> {
        let mut remaining = self.nav.scaled(ms);
        while !remaining.is_zero() {
            self.check_shutdown()?;
            let slice = remaining.min(PAUSE_SLICE);
            thread::sleep(slice);
            remaining -= slice;
        }
        Ok(())
    }

    fn check_shutdown(&self) -> Result<()> {
        if self.ctx.shared.should_shutdown() {
            warn!("Fastest run interrupted by shutdown");
            return Err(Error::Other("fastest run interrupted".to_string()));
        }
        Ok(())
    }
}
