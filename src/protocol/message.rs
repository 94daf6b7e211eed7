//! Operator link messages.
//!
//! Every frame is one JSON object per line: `{"cat": <category>, "value": <any>}`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

/// Operating mode of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RobotMode {
    Manual = 0,
    Path = 1,
}

impl RobotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotMode::Manual => "manual",
            RobotMode::Path => "path",
        }
    }

    /// Capitalised name used in operator notifications.
    pub fn title(&self) -> &'static str {
        match self {
            RobotMode::Manual => "Manual",
            RobotMode::Path => "Path",
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        if value == RobotMode::Path as u8 {
            RobotMode::Path
        } else {
            RobotMode::Manual
        }
    }
}

impl FromStr for RobotMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manual" => Ok(RobotMode::Manual),
            "path" => Ok(RobotMode::Path),
            other => Err(Error::InvalidMessage(format!("unknown mode '{}'", other))),
        }
    }
}

impl fmt::Display for RobotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Planned pose reported back to the operator as each path command completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: i32,
    pub y: i32,
    pub d: i32,
    #[serde(default)]
    pub s: i32,
}

impl Waypoint {
    pub fn new(x: i32, y: i32, d: i32, s: i32) -> Self {
        Self { x, y, d, s }
    }
}

/// Inbound operator request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cat", content = "value", rename_all = "kebab-case")]
pub enum OperatorRequest {
    Mode(String),
    Manual(String),
    Obstacles(Value),
    Control(String),
    SingleObstacle(Value),
}

impl OperatorRequest {
    /// Parse one frame. Unknown categories and malformed JSON are errors the
    /// receiver drops.
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Outbound message category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Info,
    Error,
    Status,
    Mode,
    Location,
    ImageRec,
}

/// Message queued for the operator sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "cat")]
    pub category: Category,
    pub value: Value,
}

impl OutboundMessage {
    pub fn new(category: Category, value: Value) -> Self {
        Self { category, value }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Category::Info, Value::String(text.into()))
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Category::Error, Value::String(text.into()))
    }

    /// `running` or `finished`.
    pub fn status(state: &str) -> Self {
        Self::new(Category::Status, Value::String(state.to_string()))
    }

    pub fn mode(mode: RobotMode) -> Self {
        Self::new(Category::Mode, Value::String(mode.as_str().to_string()))
    }

    pub fn location(waypoint: &Waypoint) -> Self {
        Self::new(
            Category::Location,
            json!({ "x": waypoint.x, "y": waypoint.y, "d": waypoint.d }),
        )
    }

    pub fn image_rec(image_id: &str, obstacle_id: &str) -> Self {
        Self::new(
            Category::ImageRec,
            json!({ "image_id": image_id, "obstacle_id": obstacle_id }),
        )
    }

    /// Text payload for `info`/`error`/`status`/`mode` messages.
    pub fn text(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
