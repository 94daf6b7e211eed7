//! In-memory service stand-ins for tests and bench runs.

use super::api::{Classification, PathPlanner, PathRequest, PlannedPath, VisionService};
use super::camera::Camera;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Vision service answering from a script of image ids.
///
/// An empty script answers with a non-success status.
#[derive(Default)]
pub struct MockVision {
    answers: Mutex<VecDeque<Option<String>>>,
    uploads: Mutex<Vec<String>>,
    stitch_fails: AtomicBool,
    stitches: AtomicUsize,
}

impl MockVision {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the `image_id` returned by the next classification.
    pub fn answer(&self, image_id: &str) {
        self.answers.lock().push_back(Some(image_id.to_string()));
    }

    /// Queue a failed classification.
    pub fn fail_next(&self) {
        self.answers.lock().push_back(None);
    }

    pub fn set_stitch_failure(&self, fail: bool) {
        self.stitch_fails.store(fail, Ordering::Relaxed);
    }

    /// Filenames uploaded so far.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }

    pub fn stitch_count(&self) -> usize {
        self.stitches.load(Ordering::Relaxed)
    }
}

impl VisionService for MockVision {
    fn classify(&self, filename: &str, _jpeg: Vec<u8>) -> Result<Classification> {
        self.uploads.lock().push(filename.to_string());
        match self.answers.lock().pop_front().flatten() {
            Some(image_id) => {
                // `<ts>_<obstacle>_<signal>.jpg`
                let obstacle_id = filename.split('_').nth(1).unwrap_or_default().to_string();
                Ok(Classification {
                    obstacle_id,
                    image_id,
                })
            }
            None => Err(Error::Service {
                service: "image",
                status: 500,
            }),
        }
    }

    fn stitch(&self) -> Result<()> {
        self.stitches.fetch_add(1, Ordering::Relaxed);
        if self.stitch_fails.load(Ordering::Relaxed) {
            return Err(Error::Service {
                service: "stitch",
                status: 500,
            });
        }
        Ok(())
    }
}

/// Path planner returning a preset plan.
pub struct MockPlanner {
    healthy: AtomicBool,
    plan: Mutex<Option<PlannedPath>>,
    requests: Mutex<Vec<PathRequest>>,
}

impl MockPlanner {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            plan: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    /// Plan returned by `plan`; `None` makes planning fail.
    pub fn set_plan(&self, plan: Option<PlannedPath>) {
        *self.plan.lock() = plan;
    }

    pub fn requests(&self) -> Vec<PathRequest> {
        self.requests.lock().clone()
    }
}

impl Default for MockPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PathPlanner for MockPlanner {
    fn health(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn plan(&self, request: &PathRequest) -> Result<PlannedPath> {
        self.requests.lock().push(request.clone());
        self.plan.lock().clone().ok_or(Error::Service {
            service: "path",
            status: 500,
        })
    }
}

/// Camera returning a minimal JPEG header, or failing on demand.
#[derive(Default)]
pub struct MockCamera {
    fail: AtomicBool,
    captures: AtomicUsize,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failure(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::Relaxed)
    }
}

impl Camera for MockCamera {
    fn capture_jpeg(&self) -> Result<Vec<u8>> {
        self.captures.fetch_add(1, Ordering::Relaxed);
        if self.fail.load(Ordering::Relaxed) {
            return Err(Error::Camera("camera unavailable".to_string()));
        }
        Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }
}
