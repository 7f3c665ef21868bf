//! Foundation types for fsmark.
//!
//! A marker's on-disk identity is the SHA-256 digest of its key, split into a
//! shard directory name and a leaf file name. The leaf holds the marker's
//! expiry as decimal nanoseconds since the UNIX epoch.
//!
//! # Key Types
//!
//! - [`KeyDigest`] -- SHA-256 digest of a marker key
//! - [`ShardPrefixLen`] -- validated shard directory name length
//! - [`Expiry`] -- absolute expiry instant, or never

pub mod digest;
pub mod error;
pub mod expiry;

pub use digest::{is_hex_name, KeyDigest, ShardPrefixLen, ALLOWED_PREFIX_LENGTHS, DIGEST_HEX_LEN};
pub use error::TypeError;
pub use expiry::{now_nanos, Expiry};
