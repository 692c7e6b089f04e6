//! Error types for the beautifier

use thiserror::Error;

/// Result type alias for beautifier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting, compositing or exporting
#[derive(Error, Debug)]
pub enum Error {
    /// An `image/*` payload could not be decoded
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Filesystem failure while reading a source or writing an export
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to rasterize the composited frame
    #[error("Rendering failed: {0}")]
    Render(String),

    /// Failed to encode the rasterized frame
    #[error("Encoding {format} failed: {reason}")]
    Encode { format: &'static str, reason: String },

    /// Clipboard read or write failed
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// The triggering control already has an operation in flight
    #[error("{0} is already in progress")]
    Busy(&'static str),

    /// Export was requested with no image loaded
    #[error("No image loaded")]
    NoImage,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Network error talking to the palette service
    #[error("Network error: {0}")]
    Network(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(feature = "palette")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}
