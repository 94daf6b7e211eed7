//! Shared test rig.

use sarathi::config::{Config, NavigationConfig};
use sarathi::context::Context;
use sarathi::protocol::OutboundMessage;
use sarathi::services::{MockCamera, MockPlanner, MockVision};
use sarathi::shared::SharedState;
use sarathi::transport::{Link, MockLink};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Generous bound for anything a worker thread should do promptly.
pub const WAIT: Duration = Duration::from_secs(3);

pub struct TestHarness {
    pub ctx: Context,
    pub controller: Arc<MockLink>,
    pub operator: Arc<MockLink>,
    pub vision: Arc<MockVision>,
    pub planner: Arc<MockPlanner>,
    pub camera: Arc<MockCamera>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_navigation(NavigationConfig::immediate())
    }

    pub fn with_navigation(navigation: NavigationConfig) -> Self {
        let controller = Arc::new(MockLink::new("controller"));
        let operator = Arc::new(MockLink::new("operator"));
        let vision = Arc::new(MockVision::new());
        let planner = Arc::new(MockPlanner::new());
        let camera = Arc::new(MockCamera::new());
        let config = Config {
            navigation,
            ..Config::default()
        };

        let ctx = Context {
            shared: Arc::new(SharedState::new()),
            controller: controller.clone(),
            operator: operator.clone(),
            vision: vision.clone(),
            planner: planner.clone(),
            camera: camera.clone(),
            config: Arc::new(config),
        };

        Self {
            ctx,
            controller,
            operator,
            vision,
            planner,
            camera,
        }
    }

    pub fn queued(&self) -> Vec<String> {
        self.ctx
            .shared
            .commands
            .snapshot()
            .iter()
            .map(|c| c.as_str().to_string())
            .collect()
    }

    /// Next operator-bound message, waiting up to [`WAIT`].
    pub fn next_outbound(&self) -> Option<OutboundMessage> {
        self.ctx.shared.outbound().recv_timeout(WAIT).ok()
    }

    /// Next token written to the controller.
    pub fn next_controller(&self, timeout: Duration) -> Option<String> {
        self.controller.next_sent(timeout)
    }

    /// Poll `condition` until it holds or [`WAIT`] elapses.
    pub fn wait_until(&self, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        condition()
    }

    /// Stop every worker: shutdown flag, then unblock the controller reader.
    pub fn shutdown(&self) {
        self.ctx.shared.signal_shutdown();
        self.controller.disconnect();
    }
}
