use crate::error::{AddressCacheError, Result};
use std::time::Duration;

pub const DEFAULT_MAX_SIZE: usize = 50;
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the address cache service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCacheConfig {
    /// Maximum number of cached addresses
    pub max_size: usize,
    /// Age after which a cached address is discarded
    pub expiration: Duration,
    /// Period of the background expired-entry sweep
    pub sweep_interval: Duration,
}

impl Default for AddressCacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            expiration: DEFAULT_EXPIRATION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl AddressCacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(AddressCacheError::InvalidConfig(
                "max_size must be at least 1".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(AddressCacheError::InvalidConfig(
                "sweep_interval must be non-zero".to_string(),
            ));
        }
        // The sweep timer schedules its first tick one interval from now
        if tokio::time::Instant::now()
            .checked_add(self.sweep_interval)
            .is_none()
        {
            return Err(AddressCacheError::InvalidConfig(format!(
                "sweep_interval {:?} is out of range",
                self.sweep_interval
            )));
        }
        if chrono::TimeDelta::from_std(self.expiration).is_err() {
            return Err(AddressCacheError::InvalidConfig(format!(
                "expiration {:?} is out of range",
                self.expiration
            )));
        }
        Ok(())
    }
}
