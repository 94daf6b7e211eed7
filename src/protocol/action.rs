//! Work items for the action dispatcher.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Operator requested a mode change (raw mode string)
    Mode(String),
    /// Obstacle list to plan a path through
    Obstacles(Value),
    /// Load the single-obstacle calibration path
    SingleObstacle,
    /// Capture and classify, then release the motion lock
    Snap {
        obstacle_id: String,
        signal: String,
    },
    /// Ask the image service to stitch the session's images
    Stitch,
}
