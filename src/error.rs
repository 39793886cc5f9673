//! # Error Types
//!
//! Custom error types for Pad Bridge using `thiserror`.

use std::time::Duration;
use thiserror::Error;

/// Main error type for Pad Bridge
#[derive(Debug, Error)]
pub enum PadBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted mapping could not be encoded or decoded
    #[error("Mapping file error: {0}")]
    Mapping(#[from] serde_json::Error),

    /// No game controller is available
    #[error("No game controller found")]
    ControllerNotFound,

    /// Controller access failed after it was found
    #[error("Controller error: {0}")]
    Controller(String),

    /// The translation loop was asked to run without any binding
    #[error("No bindings configured, calibrate or bind an input first")]
    NoBindings,

    /// Calibration could not finish; nothing was committed
    #[error("Calibration aborted: {0}")]
    CalibrationAborted(String),

    /// Input capture gave up waiting for the user
    #[error("Timed out waiting for a controller input")]
    CaptureTimedOut,

    /// Malformed textual input id (expected `axis:<i>:<±1>` or `button:<i>`)
    #[error("Invalid input id: {0}")]
    InvalidInputId(String),

    /// Malformed textual action descriptor
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Key name not known to the key table
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// The injection sink rejected an event
    #[error("Injection error: {0}")]
    Injection(String),

    /// The worker did not acknowledge a stop request in time
    #[error("Translation loop did not stop within {0:?}")]
    StopTimeout(Duration),

    /// The worker thread panicked
    #[error("Translation loop worker panicked")]
    WorkerPanicked,
}

/// Result type alias for Pad Bridge
pub type Result<T> = std::result::Result<T, PadBridgeError>;
