//! Error types for the bounded cache

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Capacity must be at least one entry
    InvalidCapacity(usize),
    /// Expiration does not fit in a signed millisecond range
    InvalidExpiration(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidCapacity(size) => {
                write!(f, "Invalid capacity: {} (must be at least 1)", size)
            }
            CacheError::InvalidExpiration(msg) => write!(f, "Invalid expiration: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}

pub type Result<T> = std::result::Result<T, CacheError>;
