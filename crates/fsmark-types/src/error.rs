use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid expiry encoding: {0:?}")]
    InvalidExpiry(String),

    #[error("invalid shard prefix length {len}: must be one of {allowed:?}")]
    InvalidPrefixLength { len: usize, allowed: &'static [usize] },
}
