//! Common error types for upsync

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for upsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the upsync crates
#[derive(Error, Debug)]
pub enum Error {
    /// A file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
