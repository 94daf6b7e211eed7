//! Configuration loading for Sarathi

use crate::error::{Error, Result};
use crate::navigation::Course;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Operator link (TCP server)
#[derive(Clone, Debug, Deserialize)]
pub struct OperatorConfig {
    /// Address the operator server listens on (default: 0.0.0.0:5180)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Delay between reconnect attempts in milliseconds (default: 1000)
    #[serde(default = "default_reconnect_retry")]
    pub reconnect_retry_ms: u64,
}

/// Motion controller serial link
#[derive(Clone, Debug, Deserialize)]
pub struct ControllerConfig {
    /// Serial port path (default: /dev/ttyUSB0)
    #[serde(default = "default_serial_port")]
    pub port: String,

    /// Baud rate (default: 115200)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Port read timeout in milliseconds (default: 100)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

/// Remote HTTP services
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    /// Image-recognition service base URL
    #[serde(default = "default_image_url")]
    pub image_url: String,

    /// Path-planning service base URL
    #[serde(default = "default_path_url")]
    pub path_url: String,

    /// Health check timeout in milliseconds (default: 1000)
    #[serde(default = "default_health_timeout")]
    pub health_timeout_ms: u64,

    /// Timeout for classify/stitch/plan requests in milliseconds (default: 10000)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

/// Still camera capture command; must write a JPEG to stdout
#[derive(Clone, Debug, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_command")]
    pub command: String,

    #[serde(default = "default_camera_args")]
    pub args: Vec<String>,
}

/// Sensor sources and debounce parameters
#[derive(Clone, Debug, Deserialize)]
pub struct SensorConfig {
    /// IIO distance reading in millimetres
    #[serde(default = "default_distance_path")]
    pub distance_path: String,

    /// GPIO value file of the left proximity sensor (1 = clear)
    #[serde(default = "default_left_path")]
    pub left_path: String,

    /// GPIO value file of the right proximity sensor (1 = clear)
    #[serde(default = "default_right_path")]
    pub right_path: String,

    /// Sampling period of every sensor loop in milliseconds (default: 100)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Front flag blocks below this distance in cm (default: 28.0)
    #[serde(default = "default_short_threshold")]
    pub short_threshold_cm: f32,

    /// Long-range flag blocks below this distance in cm (default: 50.0)
    #[serde(default = "default_long_threshold")]
    pub long_threshold_cm: f32,

    /// Consecutive below-threshold samples needed to block (default: 2)
    #[serde(default = "default_debounce_samples")]
    pub debounce_samples: u32,
}

/// Fastest run timing and measurement parameters
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    /// Multiplier applied to every pause; 0 disables waiting
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Pause after stopping in front of an obstacle (ms)
    #[serde(default = "default_approach_settle")]
    pub approach_settle_ms: u64,

    /// Pause after clearing the first obstacle, before measuring the gap (ms)
    #[serde(default = "default_clear_settle")]
    pub clear_settle_ms: u64,

    /// Number of distance samples taken for the gap
    #[serde(default = "default_gap_samples")]
    pub gap_samples: usize,

    /// Interval between gap samples (ms)
    #[serde(default = "default_gap_sample_interval")]
    pub gap_sample_interval_ms: u64,

    /// Samples at or above this are discarded (cm)
    #[serde(default = "default_gap_upper_bound")]
    pub gap_upper_bound_cm: f32,

    /// Gap used when every sample was discarded (cm)
    #[serde(default = "default_gap_fallback")]
    pub gap_fallback_cm: f32,

    /// Added to the measured gap (cm)
    #[serde(default = "default_gap_offset")]
    pub gap_offset_cm: f32,

    /// Distance credited per `FW10` while passing an obstacle (cm)
    #[serde(default = "default_lateral_step")]
    pub lateral_step_cm: u32,

    /// Pause between obstacle-passing steps (ms)
    #[serde(default = "default_pass_step")]
    pub pass_step_ms: u64,

    /// Pause before the final buzz (ms)
    #[serde(default = "default_finish_settle")]
    pub finish_settle_ms: u64,

    /// Maneuver scripts for each phase
    #[serde(default)]
    pub course: Course,
}

/// Robot-wide switches
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RobotConfig {
    /// Rewrite loaded paths for the outdoor controller calibration
    #[serde(default)]
    pub outdoor: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when RUST_LOG is unset (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            reconnect_retry_ms: default_reconnect_retry(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            image_url: default_image_url(),
            path_url: default_path_url(),
            health_timeout_ms: default_health_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            command: default_camera_command(),
            args: default_camera_args(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            distance_path: default_distance_path(),
            left_path: default_left_path(),
            right_path: default_right_path(),
            poll_interval_ms: default_poll_interval(),
            short_threshold_cm: default_short_threshold(),
            long_threshold_cm: default_long_threshold(),
            debounce_samples: default_debounce_samples(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            approach_settle_ms: default_approach_settle(),
            clear_settle_ms: default_clear_settle(),
            gap_samples: default_gap_samples(),
            gap_sample_interval_ms: default_gap_sample_interval(),
            gap_upper_bound_cm: default_gap_upper_bound(),
            gap_fallback_cm: default_gap_fallback(),
            gap_offset_cm: default_gap_offset(),
            lateral_step_cm: default_lateral_step(),
            pass_step_ms: default_pass_step(),
            finish_settle_ms: default_finish_settle(),
            course: Course::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:5180".to_string()
}
fn default_reconnect_retry() -> u64 {
    1000
}
fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    115200
}
fn default_read_timeout() -> u64 {
    100
}
fn default_image_url() -> String {
    "http://192.168.14.13:5000".to_string()
}
fn default_path_url() -> String {
    "http://192.168.14.13:5000".to_string()
}
fn default_health_timeout() -> u64 {
    1000
}
fn default_request_timeout() -> u64 {
    10000
}
fn default_camera_command() -> String {
    "libcamera-still".to_string()
}
fn default_camera_args() -> Vec<String> {
    ["-n", "-t", "1000", "-o", "-"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// Sensor defaults
fn default_distance_path() -> String {
    "/sys/bus/iio/devices/iio:device0/in_distance_raw".to_string()
}
fn default_left_path() -> String {
    "/sys/class/gpio/gpio16/value".to_string()
}
fn default_right_path() -> String {
    "/sys/class/gpio/gpio26/value".to_string()
}
fn default_poll_interval() -> u64 {
    100
}
fn default_short_threshold() -> f32 {
    28.0
}
fn default_long_threshold() -> f32 {
    50.0
}
fn default_debounce_samples() -> u32 {
    2
}

// Navigation defaults
fn default_time_scale() -> f64 {
    1.0
}
fn default_approach_settle() -> u64 {
    1000
}
fn default_clear_settle() -> u64 {
    13000
}
fn default_gap_samples() -> usize {
    5
}
fn default_gap_sample_interval() -> u64 {
    500
}
fn default_gap_upper_bound() -> f32 {
    150.0
}
fn default_gap_fallback() -> f32 {
    100.0
}
fn default_gap_offset() -> f32 {
    70.0
}
fn default_lateral_step() -> u32 {
    10
}
fn default_pass_step() -> u64 {
    5000
}
fn default_finish_settle() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Self::parse(&content)
    }

    /// Load from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("Config {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn reconnect_retry(&self) -> Duration {
        Duration::from_millis(self.operator.reconnect_retry_ms)
    }
}

impl NavigationConfig {
    /// Same scripts and measurements with every pause skipped.
    pub fn immediate() -> Self {
        Self {
            time_scale: 0.0,
            ..Self::default()
        }
    }

    /// A configured pause after applying `time_scale`.
    pub fn scaled(&self, ms: u64) -> Duration {
        Duration::from_secs_f64(ms as f64 * self.time_scale.max(0.0) / 1000.0)
    }
}
