//! Per-run measurements and classification results.

/// Which way the course goes around an obstacle, from its arrow marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    /// Image id 39
    Left,
    /// Image id 38
    Right,
    /// Anything else, including a failed classification; driven like `Right`
    Default(Option<String>),
}

impl Branch {
    pub fn from_image_id(image_id: &str) -> Self {
        match image_id {
            "39" => Branch::Left,
            "38" => Branch::Right,
            other => Branch::Default(Some(other.to_string())),
        }
    }

    /// Whether maneuvers are run mirrored.
    pub fn is_left(&self) -> bool {
        matches!(self, Branch::Left)
    }
}

/// Owned by one fastest run; nothing else reads or writes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    /// Distance driven sideways while passing the second obstacle (cm)
    pub lateral_cm: u32,
    /// Time spent on open-ended forward approaches (s)
    pub forward_secs: f64,
    /// Measured distance between the obstacles plus offset (cm)
    pub gap_cm: u32,
    pub first: Option<Branch>,
    pub second: Option<Branch>,
}
