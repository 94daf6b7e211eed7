//! HTTP clients for the image-recognition and path-planning services.
//!
//! | Endpoint | Service | Success |
//! |----------|---------|---------|
//! | `POST /image` (multipart `file`) | image | 200 `{"obstacle_id", "image_id"}` |
//! | `GET /stitch` | image | 200 |
//! | `GET /status` | path | 200 |
//! | `POST /path` | path | 200 `{"data": {"commands", "path"}}` |

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::protocol::Waypoint;
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::{Client, multipart};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Result of classifying one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub obstacle_id: String,
    pub image_id: String,
}

/// Image-recognition service.
pub trait VisionService: Send + Sync {
    fn classify(&self, filename: &str, jpeg: Vec<u8>) -> Result<Classification>;
    fn stitch(&self) -> Result<()>;
}

/// Path-planning service.
pub trait PathPlanner: Send + Sync {
    /// `true` when `GET /status` answers 200 within the health timeout.
    fn health(&self) -> bool;
    fn plan(&self, request: &PathRequest) -> Result<PlannedPath>;
}

/// Body of `POST /path`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathRequest {
    pub obstacles: Value,
    pub retrying: bool,
    pub robot_x: i32,
    pub robot_y: i32,
    pub robot_dir: i32,
}

impl PathRequest {
    /// Plan from the start box, facing north.
    pub fn from_start(obstacles: Value, retrying: bool) -> Self {
        Self {
            obstacles,
            retrying,
            robot_x: 1,
            robot_y: 1,
            robot_dir: 0,
        }
    }
}

/// Commands and the poses they lead through. `path[0]` is the start pose.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlannedPath {
    pub commands: Vec<String>,
    pub path: Vec<Waypoint>,
}

#[derive(Deserialize)]
struct PlanResponse {
    data: PlannedPath,
}

fn id_string(body: &Value, key: &str) -> Result<String> {
    match body.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::InvalidMessage(format!("response missing '{}'", key))),
    }
}

/// The services answer 200 on success; any other code, 2xx included, is a failure.
fn accepted(status: StatusCode) -> bool {
    status == StatusCode::OK
}

fn check(service: &'static str, status: StatusCode) -> Result<()> {
    if accepted(status) {
        Ok(())
    } else {
        Err(Error::Service {
            service,
            status: status.as_u16(),
        })
    }
}

/// Blocking client for the image-recognition service.
pub struct ImageRecClient {
    client: Client,
    base_url: String,
}

impl ImageRecClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.image_url.trim_end_matches('/').to_string(),
        })
    }
}

impl VisionService for ImageRecClient {
    fn classify(&self, filename: &str, jpeg: Vec<u8>) -> Result<Classification> {
        debug!("Requesting classification of {} ({} bytes)", filename, jpeg.len());
        let part = multipart::Part::bytes(jpeg)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/image", self.base_url))
            .multipart(form)
            .send()?;
        check("image", response.status())?;

        let body: Value = response.json()?;
        Ok(Classification {
            obstacle_id: id_string(&body, "obstacle_id")?,
            image_id: id_string(&body, "image_id")?,
        })
    }

    fn stitch(&self) -> Result<()> {
        let response = self.client.get(format!("{}/stitch", self.base_url)).send()?;
        check("stitch", response.status())
    }
}

/// Blocking client for the path-planning service.
pub struct PathClient {
    client: Client,
    base_url: String,
    health_timeout: Duration,
}

impl PathClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.path_url.trim_end_matches('/').to_string(),
            health_timeout: Duration::from_millis(config.health_timeout_ms),
        })
    }
}

impl PathPlanner for PathClient {
    fn health(&self) -> bool {
        match self
            .client
            .get(format!("{}/status", self.base_url))
            .timeout(self.health_timeout)
            .send()
        {
            Ok(response) if accepted(response.status()) => {
                debug!("API is up!");
                true
            }
            Ok(response) => {
                warn!("API status returned {}", response.status());
                false
            }
            Err(e) if e.is_timeout() => {
                warn!("API Timeout");
                false
            }
            Err(e) => {
                warn!("API Connection Error: {}", e);
                false
            }
        }
    }

    fn plan(&self, request: &PathRequest) -> Result<PlannedPath> {
        let response = self
            .client
            .post(format!("{}/path", self.base_url))
            .json(request)
            .send()?;
        check("path", response.status())?;
        let body: PlanResponse = response.json()?;
        Ok(body.data)
    }
}
