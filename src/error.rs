//! Error types for Sarathi

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Sarathi error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (sockets, sysfs files, camera process)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error on the controller link
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// HTTP transport error talking to the image or path service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON on the operator link or from a service
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Link is not connected
    #[error("Link not connected: {0}")]
    NotConnected(&'static str),

    /// Peer closed the link
    #[error("Link closed: {0}")]
    LinkClosed(&'static str),

    /// Movement token outside the controller vocabulary
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Remote service answered with a non-success status
    #[error("Service error: {service} returned status {status}")]
    Service {
        /// Endpoint that failed
        service: &'static str,
        /// HTTP status code
        status: u16,
    },

    /// Still capture failed
    #[error("Camera error: {0}")]
    Camera(String),

    /// Sensor read failed
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Operator message that could not be interpreted
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
