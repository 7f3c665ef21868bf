//! Filesystem-backed ephemeral marker store.
//!
//! A marker is a keyed existence flag with an expiry. Markers live as small
//! files under a root directory, sharded by the SHA-256 digest of their key:
//!
//! ```text
//! <root>/<shard-prefix>/<leaf>      content: expiry in decimal ns since epoch
//! ```
//!
//! # Components
//!
//! - [`PathSharder`] -- key to path mapping
//! - [`FsMarkStore`] -- create / exist / delete / clear, implementing
//!   [`MarkerStore`]
//! - [`FsMarkStore::gc`] -- one sweep reclaiming expired markers, empty
//!   shards, and foreign entries
//! - [`FsMarkStore::spawn_gc`] -- the same sweep on a cancellable timer
//!
//! # Design Rules
//!
//! 1. A marker's expiry is immutable; re-creating a key replaces the marker.
//! 2. Expired and corrupt markers read as absent and are reclaimed lazily.
//! 3. One store-wide lock: shared for inspection, exclusive for any removal
//!    or write, including the ones the collector makes.
//! 4. The collector never removes a marker that is live when it checks.
//! 5. Expiry `0` means the marker never expires.

pub mod config;
pub mod daemon;
pub mod error;
pub mod fs;
pub mod gc;
pub mod sharder;
pub mod traits;

pub use config::StoreConfig;
pub use daemon::GcHandle;
pub use error::{StoreError, StoreResult};
pub use fs::{FsMarkStore, MarkerState};
pub use gc::GcReport;
pub use sharder::PathSharder;
pub use traits::MarkerStore;

pub use fsmark_types::{Expiry, KeyDigest, ShardPrefixLen};
