//! Cache configuration

use std::fmt;

use crate::error::{Error, Result};

/// Capacity used by [`LruConfig::default`]
pub const DEFAULT_CAPACITY: usize = 128;

/// Construction parameters for [`LruCache`](crate::LruCache)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LruConfig {
    capacity: usize,
}

impl LruConfig {
    /// Create a config with the given capacity (validated on use)
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Build a config from any integer type, rejecting values that are
    /// negative or do not fit in `usize`
    pub fn try_from_int<C>(capacity: C) -> Result<Self>
    where
        C: TryInto<usize> + fmt::Display + Copy,
    {
        let converted = capacity.try_into().map_err(|_| {
            Error::InvalidConfiguration(format!(
                "capacity must be a positive integer, got {}",
                capacity
            ))
        })?;
        let config = Self::new(converted);
        config.validate()?;
        Ok(config)
    }

    /// Set the maximum number of entries
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Configured maximum number of entries
    pub fn max_entries(&self) -> usize {
        self.capacity
    }

    /// Check that the config describes a usable cache
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "capacity must be greater than 0, got 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LruConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
