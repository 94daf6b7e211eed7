//! Handles every thread needs: shared state, links, services, configuration.

use crate::config::Config;
use crate::services::{Camera, PathPlanner, VisionService};
use crate::shared::SharedState;
use crate::transport::Link;
use std::sync::Arc;

#[derive(Clone)]
pub struct Context {
    pub shared: Arc<SharedState>,
    pub controller: Arc<dyn Link>,
    pub operator: Arc<dyn Link>,
    pub vision: Arc<dyn VisionService>,
    pub planner: Arc<dyn PathPlanner>,
    pub camera: Arc<dyn Camera>,
    pub config: Arc<Config>,
}

impl Context {
    /// Send a token straight to the controller, bypassing the queue.
    ///
    /// Used for buzzer signals that must not wait behind queued motion.
    pub fn signal_controller(&self, token: &str) {
        if let Err(e) = self.controller.send(token) {
            log::error!("Failed to send {} to controller: {}", token, e);
        }
    }
}
