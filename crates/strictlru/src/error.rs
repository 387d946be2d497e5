//! Error types for strictlru

use std::fmt;

/// Result type alias for strictlru operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported synchronously by the cache at the offending call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Capacity was zero, negative, or not representable as `usize`.
    /// No cache is produced.
    InvalidConfiguration(String),

    /// A checked entry point received an absent key or value.
    /// The cache is left untouched.
    InvalidArgument(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Returned by [`LruCache::check_invariants`](crate::LruCache::check_invariants)
/// when the index and the recency list disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Description of the violated invariant
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}
