use std::time::Duration;

use crate::error::StoreResult;

/// Keyed, expirable existence flags.
///
/// Implementations must satisfy these invariants:
/// - A marker's expiry is immutable once written; creating an existing key
///   replaces the marker.
/// - `exist` never fails: missing, expired, and unreadable markers all
///   report `false`.
/// - `delete` is idempotent.
pub trait MarkerStore: Send + Sync {
    /// TTL applied by [`create`](MarkerStore::create).
    fn default_ttl(&self) -> Duration;

    /// Create (or replace) the marker for `key`, expiring after `ttl`.
    /// A zero TTL creates a marker that never expires.
    fn create_with_ttl(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    /// Returns `true` if an unexpired marker exists for `key`.
    fn exist(&self, key: &str) -> bool;

    /// Remove the marker for `key`. Removing a missing marker succeeds.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Remove every marker.
    fn clear(&self) -> StoreResult<()>;

    /// Create (or replace) the marker for `key` with the default TTL.
    fn create(&self, key: &str) -> StoreResult<()> {
        self.create_with_ttl(key, self.default_ttl())
    }
}
