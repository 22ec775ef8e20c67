//! Error types for the address tracker

use std::fmt;

#[derive(Debug)]
pub enum TrackerError {
    AddressCache(address_cache::AddressCacheError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::AddressCache(err) => write!(f, "Address cache error: {}", err),
            TrackerError::Io(err) => write!(f, "IO error: {}", err),
            TrackerError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::AddressCache(err) => Some(err),
            TrackerError::Io(err) => Some(err.as_ref()),
            TrackerError::Config(_) => None,
        }
    }
}

impl From<address_cache::AddressCacheError> for TrackerError {
    fn from(err: address_cache::AddressCacheError) -> Self {
        TrackerError::AddressCache(err)
    }
}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for TrackerError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        TrackerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
