//! Common error types for flora

use thiserror::Error;

/// Common result type for flora operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across flora crates
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
