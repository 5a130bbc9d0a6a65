//! Teleport error types
//!
//! Runtime transition operations are total and never fail. Errors only
//! surface when loading or validating configuration.

use thiserror::Error;

/// Configuration and validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TeleportError {
    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// An animation curve has an unusable parameter
    #[error("Invalid animation curve: {0}")]
    InvalidCurve(String),

    /// A corner radius is negative or not finite
    #[error("Invalid corner radius: {0}")]
    InvalidCornerRadius(f32),

    /// Frame rate outside the supported range
    #[error("Invalid target frame rate: {0}")]
    InvalidFrameRate(u32),
}

impl From<toml::de::Error> for TeleportError {
    fn from(err: toml::de::Error) -> Self {
        TeleportError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TeleportError {
    fn from(err: toml::ser::Error) -> Self {
        TeleportError::Config(err.to_string())
    }
}

/// Result type for teleport configuration operations
pub type Result<T> = std::result::Result<T, TeleportError>;
