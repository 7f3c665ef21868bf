use std::path::{Path, PathBuf};
use std::time::Duration;

use fsmark_types::ShardPrefixLen;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Construction parameters for an [`FsMarkStore`](crate::FsMarkStore).
///
/// Serializable so a host application can embed it in its own config file.
/// Missing fields fall back to [`StoreConfig::default`].
///
/// ```rust
/// use fsmark_store::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::new("/var/tmp/markers")
///     .with_default_ttl(Duration::from_secs(300))
///     .with_gc_interval(Duration::from_secs(30));
/// assert_eq!(config.default_ttl, Duration::from_secs(300));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding every marker. Made absolute when the store opens.
    pub root: PathBuf,
    /// Unix permission bits for created directories. Marker files get the
    /// same bits with execute masked off. Ignored on other platforms.
    pub mode: u32,
    /// TTL used by [`create`](crate::MarkerStore::create). Zero means markers
    /// never expire.
    pub default_ttl: Duration,
    /// Delay between sweeps of the background collector.
    pub gc_interval: Duration,
    /// Hex length of shard directory names. Must not change for an existing
    /// root.
    pub shard_prefix_len: ShardPrefixLen,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join("fsmark"),
            mode: 0o755,
            default_ttl: Duration::from_secs(60 * 60),
            gc_interval: Duration::from_secs(60),
            shard_prefix_len: ShardPrefixLen::default(),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }

    pub fn with_shard_prefix_len(mut self, len: ShardPrefixLen) -> Self {
        self.shard_prefix_len = len;
        self
    }

    /// Permission bits applied to marker files.
    pub fn file_mode(&self) -> u32 {
        self.mode & 0o666
    }

    /// Check the configuration for values the store cannot run with.
    pub fn validate(&self) -> StoreResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig("root path is empty".into()));
        }
        if self.mode > 0o7777 {
            return Err(StoreError::InvalidConfig(format!(
                "mode {:o} has bits outside 0o7777",
                self.mode
            )));
        }
        if self.gc_interval.is_zero() {
            return Err(StoreError::InvalidConfig(
                "gc_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
