use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TypeError;

/// Hex length of a full key digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Shard prefix lengths (in hex characters) a store may be configured with.
pub const ALLOWED_PREFIX_LENGTHS: &[usize] = &[4, 6, 8];

/// Default shard prefix length: two bytes of hash, 65 536 shards.
pub const DEFAULT_PREFIX_LEN: usize = 4;

/// SHA-256 digest of a marker key.
///
/// The digest is the only on-disk identity a marker has; the key itself is
/// never written. Changing the hash algorithm invalidates every existing
/// tree, so the algorithm is part of the type name rather than a parameter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyDigest([u8; 32]);

impl KeyDigest {
    /// Hash a key. Any string is accepted, including the empty string.
    pub fn sha256(key: &str) -> Self {
        Self(Sha256::digest(key.as_bytes()).into())
    }

    /// Lowercase hex representation (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Split the hex digest into `(shard, leaf)` at `prefix_len`.
    pub fn split(&self, prefix_len: ShardPrefixLen) -> (String, String) {
        let mut hex = self.to_hex();
        let leaf = hex.split_off(prefix_len.get());
        (hex, leaf)
    }
}

impl fmt::Debug for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyDigest({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A validated shard prefix length.
///
/// Fixed for the lifetime of a store root: the garbage collector uses it to
/// tell shard directories and leaves apart from foreign entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct ShardPrefixLen(usize);

impl ShardPrefixLen {
    pub fn new(len: usize) -> Result<Self, TypeError> {
        if ALLOWED_PREFIX_LENGTHS.contains(&len) {
            Ok(Self(len))
        } else {
            Err(TypeError::InvalidPrefixLength {
                len,
                allowed: ALLOWED_PREFIX_LENGTHS,
            })
        }
    }

    /// Length of a shard directory name.
    pub fn get(self) -> usize {
        self.0
    }

    /// Length of a leaf file name under a shard.
    pub fn leaf_len(self) -> usize {
        DIGEST_HEX_LEN - self.0
    }
}

impl Default for ShardPrefixLen {
    fn default() -> Self {
        Self(DEFAULT_PREFIX_LEN)
    }
}

impl TryFrom<usize> for ShardPrefixLen {
    type Error = TypeError;

    fn try_from(len: usize) -> Result<Self, Self::Error> {
        Self::new(len)
    }
}

impl From<ShardPrefixLen> for usize {
    fn from(len: ShardPrefixLen) -> Self {
        len.0
    }
}

/// Returns `true` if `name` is lowercase hex of exactly `len` characters.
pub fn is_hex_name(name: &str, len: usize) -> bool {
    name.len() == len && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sha256_of_empty_key_is_well_known() {
        let digest = KeyDigest::sha256("");
        assert_eq!(
            digest.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn different_keys_produce_different_digests() {
        assert_ne!(KeyDigest::sha256("A"), KeyDigest::sha256("B"));
    }

    #[test]
    fn split_default_prefix() {
        let (shard, leaf) = KeyDigest::sha256("").split(ShardPrefixLen::default());
        assert_eq!(shard, "e3b0");
        assert_eq!(leaf.len(), 60);
        assert!(leaf.starts_with("c44298fc"));
    }

    #[test]
    fn prefix_length_validation() {
        assert!(ShardPrefixLen::new(4).is_ok());
        assert!(ShardPrefixLen::new(8).is_ok());
        assert_eq!(
            ShardPrefixLen::new(5),
            Err(TypeError::InvalidPrefixLength {
                len: 5,
                allowed: ALLOWED_PREFIX_LENGTHS
            })
        );
        assert!(ShardPrefixLen::new(0).is_err());
        assert!(ShardPrefixLen::new(64).is_err());
    }

    #[test]
    fn prefix_length_rejected_on_deserialize() {
        assert!(serde_json::from_str::<ShardPrefixLen>("6").is_ok());
        assert!(serde_json::from_str::<ShardPrefixLen>("3").is_err());
    }

    #[test]
    fn hex_name_check() {
        assert!(is_hex_name("00af", 4));
        assert!(!is_hex_name("00AF", 4));
        assert!(!is_hex_name("00a", 4));
        assert!(!is_hex_name("zzzz", 4));
    }

    #[test]
    fn debug_is_short() {
        let debug = format!("{:?}", KeyDigest::sha256(""));
        assert_eq!(debug, "KeyDigest(e3b0c442)");
    }

    proptest! {
        #[test]
        fn split_recombines_to_full_hex(key in ".*", len in prop::sample::select(ALLOWED_PREFIX_LENGTHS)) {
            let digest = KeyDigest::sha256(&key);
            let prefix = ShardPrefixLen::new(len).unwrap();
            let (shard, leaf) = digest.split(prefix);
            prop_assert_eq!(shard.len(), prefix.get());
            prop_assert_eq!(leaf.len(), prefix.leaf_len());
            prop_assert!(is_hex_name(&shard, prefix.get()));
            prop_assert!(is_hex_name(&leaf, prefix.leaf_len()));
            prop_assert_eq!(format!("{shard}{leaf}"), digest.to_hex());
        }

        #[test]
        fn digest_is_deterministic(key in ".*") {
            prop_assert_eq!(KeyDigest::sha256(&key), KeyDigest::sha256(&key));
        }
    }
}
