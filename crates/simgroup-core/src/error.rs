//! Error types for simgroup.

use thiserror::Error;

/// Result type alias for simgroup operations.
pub type Result<T> = std::result::Result<T, SimgroupError>;

/// Errors that can occur in simgroup operations.
#[derive(Error, Debug)]
pub enum SimgroupError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key-value store unreachable or failing
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input the engine cannot process (e.g. an empty document id)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for SimgroupError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}
