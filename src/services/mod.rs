//! External collaborators: HTTP services and the camera.

pub mod api;
pub mod camera;
pub mod mock;

pub use api::{
    Classification, ImageRecClient, PathClient, PathPlanner, PathRequest, PlannedPath,
    VisionService,
};
pub use camera::{Camera, CommandCamera, image_filename};
pub use mock::{MockCamera, MockPlanner, MockVision};
