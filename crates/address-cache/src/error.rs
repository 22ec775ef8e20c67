//! Error types for the address cache service

use std::fmt;

#[derive(Debug)]
pub enum AddressCacheError {
    /// Configuration rejected at construction time
    InvalidConfig(String),
    Cache(bounded_cache::CacheError),
    /// The service was torn down with `destroy()`
    Destroyed,
    /// The background sweep needs a tokio runtime
    NoRuntime,
}

impl fmt::Display for AddressCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressCacheError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            AddressCacheError::Cache(err) => write!(f, "Cache error: {}", err),
            AddressCacheError::Destroyed => write!(f, "Address cache service has been destroyed"),
            AddressCacheError::NoRuntime => {
                write!(f, "Address cache service must be created inside a tokio runtime")
            }
        }
    }
}

impl std::error::Error for AddressCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AddressCacheError::Cache(err) => Some(err),
            _ => None,
        }
    }
}

impl From<bounded_cache::CacheError> for AddressCacheError {
    fn from(err: bounded_cache::CacheError) -> Self {
        AddressCacheError::Cache(err)
    }
}

pub type Result<T> = std::result::Result<T, AddressCacheError>;
