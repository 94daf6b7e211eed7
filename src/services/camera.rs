//! Still capture through an external command.

use crate::config::CameraConfig;
use crate::error::{Error, Result};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

/// JPEG still source.
pub trait Camera: Send + Sync {
    fn capture_jpeg(&self) -> Result<Vec<u8>>;
}

/// Runs a capture command that writes one JPEG to stdout.
pub struct CommandCamera {
    command: String,
    args: Vec<String>,
}

impl CommandCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }
}

impl Camera for CommandCamera {
    fn capture_jpeg(&self) -> Result<Vec<u8>> {
        let output = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| Error::Camera(format!("failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            return Err(Error::Camera(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }
        // JPEG SOI marker
        if !output.stdout.starts_with(&[0xFF, 0xD8]) {
            return Err(Error::Camera(format!(
                "{} produced {} bytes that are not a JPEG",
                self.command,
                output.stdout.len()
            )));
        }
        log::info!("Image captured ({} bytes)", output.stdout.len());
        Ok(output.stdout)
    }
}

/// Upload name for a capture: `<unix-seconds>_<obstacle>_<signal>.jpg`.
pub fn image_filename(obstacle_id: &str, signal: &str) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{}_{}_{}.jpg", secs, obstacle_id, signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(command: &str, args: &[&str]) -> CommandCamera {
        CommandCamera::new(&CameraConfig {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_filename_shape() {
        let name = image_filename("3", "L");
        assert!(name.ends_with("_3_L.jpg"));
        let stamp = name.split('_').next().unwrap();
        assert!(stamp.parse::<u64>().unwrap() > 0);
    }

    #[test]
    fn test_missing_command_is_camera_error() {
        let cam = camera("/nonexistent/capture-tool", &[]);
        assert!(matches!(cam.capture_jpeg(), Err(Error::Camera(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_jpeg_output_rejected() {
        let cam = camera("echo", &["hello"]);
        assert!(matches!(cam.capture_jpeg(), Err(Error::Camera(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_jpeg_on_stdout() {
        let cam = camera("printf", &["\\377\\330\\377\\340"]);
        assert_eq!(cam.capture_jpeg().unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);
    }
}
