//! Filesystem-backed marker store.
//!
//! Every marker is a small file at `<root>/<shard>/<leaf>` whose content is
//! its expiry in decimal nanoseconds. One store-wide `RwLock` serializes all
//! mutation of the tree; inspections run under the shared side.

use std::fs::{self, DirBuilder};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use fsmark_types::{now_nanos, Expiry, ShardPrefixLen};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::sharder::PathSharder;
use crate::traits::MarkerStore;

/// What is on disk at a marker path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerState {
    /// Nothing at the path.
    Absent,
    /// A marker that has not yet expired.
    Live(Expiry),
    /// A marker past its expiry, not yet reclaimed.
    Expired(Expiry),
    /// Something that cannot be read as a marker: unparsable or unreadable
    /// content, or a non-file entry.
    Corrupt,
}

impl MarkerState {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    /// Present on disk but logically absent, so safe to remove.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Expired(_) | Self::Corrupt)
    }
}

struct StoreInner {
    sharder: PathSharder,
    mode: u32,
    default_ttl: Duration,
    gc_interval: Duration,
    /// Guards the whole tree under `root`; carries no data of its own.
    lock: RwLock<()>,
}

/// Filesystem-backed marker store.
///
/// Cheap to clone: clones share the same root and the same lock, so a clone
/// can be handed to a background collector or another thread.
///
/// ```rust,no_run
/// use fsmark_store::{FsMarkStore, MarkerStore, StoreConfig};
/// use std::time::Duration;
///
/// # fn main() -> fsmark_store::StoreResult<()> {
/// let store = FsMarkStore::open(StoreConfig::new("/var/tmp/markers"))?;
/// store.create_with_ttl("job:42", Duration::from_secs(30))?;
/// assert!(store.exist("job:42"));
/// store.delete("job:42")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FsMarkStore {
    inner: Arc<StoreInner>,
}

impl FsMarkStore {
    /// Open a store. Nothing is created on disk until the first write.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let root = std::path::absolute(&config.root).map_err(|e| {
            StoreError::InvalidConfig(format!(
                "cannot resolve root {}: {e}",
                config.root.display()
            ))
        })?;

        Ok(Self {
            inner: Arc::new(StoreInner {
                sharder: PathSharder::new(root, config.shard_prefix_len),
                mode: config.mode,
                default_ttl: config.default_ttl,
                gc_interval: config.gc_interval,
                lock: RwLock::new(()),
            }),
        })
    }

    /// Absolute root directory of the store.
    pub fn root(&self) -> &Path {
        self.inner.sharder.root()
    }

    pub fn sharder(&self) -> &PathSharder {
        &self.inner.sharder
    }

    pub fn prefix_len(&self) -> ShardPrefixLen {
        self.inner.sharder.prefix_len()
    }

    pub fn gc_interval(&self) -> Duration {
        self.inner.gc_interval
    }

    /// Marker path for `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.inner.sharder.path(key)
    }

    /// Classify the marker for `key` without modifying anything.
    pub fn inspect(&self, key: &str) -> MarkerState {
        let path = self.path(key);
        let _guard = self.read_lock();
        classify(&path, now_nanos())
    }

    /// Create (or replace) the marker for `key` with an explicit expiry.
    pub fn create_with_expiry(&self, key: &str, expiry: Expiry) -> StoreResult<()> {
        let path = self.path(key);
        let shard = path
            .parent()
            .ok_or_else(|| StoreError::InvalidConfig("marker path has no shard".into()))?;

        let _guard = self.write_lock();
        self.ensure_shard(shard)?;
        remove_entry(&path).map_err(|e| StoreError::io(&path, e))?;

        let mut tmp = NamedTempFile::new_in(shard).map_err(|e| StoreError::io(shard, e))?;
        tmp.write_all(expiry.encode().as_bytes())
            .and_then(|()| tmp.as_file().sync_data())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        self.apply_file_mode(tmp.as_file())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        debug!(key, %expiry, path = %path.display(), "marker created");
        Ok(())
    }

    /// Re-inspect `path` under the exclusive lock and remove it if it is
    /// still stale. Returns `true` if something was removed.
    pub(crate) fn reclaim(&self, path: &Path) -> io::Result<bool> {
        let _guard = self.write_lock();
        if !classify(path, now_nanos()).is_stale() {
            return Ok(false);
        }
        remove_entry(path)
    }

    /// Create the shard directory (and root) with the configured mode. A
    /// non-directory squatting on the shard name is replaced.
    fn ensure_shard(&self, shard: &Path) -> StoreResult<()> {
        match fs::symlink_metadata(shard) {
            Ok(meta) if meta.is_dir() => return Ok(()),
            Ok(_) => {
                warn!(path = %shard.display(), "replacing foreign entry at shard path");
                fs::remove_file(shard).map_err(|e| StoreError::io(shard, e))?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(shard, e)),
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.inner.mode);
        }
        builder.create(shard).map_err(|e| StoreError::io(shard, e))
    }

    #[cfg(unix)]
    fn apply_file_mode(&self, file: &fs::File) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(self.inner.mode & 0o666))
    }

    #[cfg(not(unix))]
    fn apply_file_mode(&self, _file: &fs::File) -> io::Result<()> {
        Ok(())
    }

    pub(crate) fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        // The lock guards no data, so a panic elsewhere cannot leave it
        // inconsistent.
        self.inner.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.lock.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MarkerStore for FsMarkStore {
    fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    fn create_with_ttl(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        self.create_with_expiry(key, Expiry::after(ttl))
    }

    fn exist(&self, key: &str) -> bool {
        let path = self.path(key);
        let state = {
            let _guard = self.read_lock();
            classify(&path, now_nanos())
        };

        match state {
            MarkerState::Live(_) => true,
            MarkerState::Absent => false,
            stale => {
                match self.reclaim(&path) {
                    Ok(true) => debug!(key, ?stale, "reclaimed stale marker"),
                    Ok(false) => {}
                    Err(e) => warn!(key, error = %e, "failed to reclaim stale marker"),
                }
                false
            }
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.path(key);
        let _guard = self.write_lock();
        if remove_entry(&path).map_err(|e| StoreError::io(&path, e))? {
            debug!(key, "marker deleted");
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let root = self.root();
        let _guard = self.write_lock();
        match fs::remove_dir_all(root) {
            Ok(()) => {
                debug!(root = %root.display(), "store cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(root, e)),
        }
    }
}

impl std::fmt::Debug for FsMarkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsMarkStore")
            .field("root", &self.root())
            .field("prefix_len", &self.prefix_len().get())
            .finish()
    }
}

/// Classify whatever is at `path` relative to `now`.
pub(crate) fn classify(path: &Path, now: u64) -> MarkerState {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return MarkerState::Corrupt,
        Err(e) if e.kind() == ErrorKind::NotFound => return MarkerState::Absent,
        Err(_) => return MarkerState::Corrupt,
    }

    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return MarkerState::Absent,
        Err(_) => return MarkerState::Corrupt,
    };

    match Expiry::decode(&raw) {
        Ok(expiry) if expiry.is_expired_at(now) => MarkerState::Expired(expiry),
        Ok(expiry) => MarkerState::Live(expiry),
        Err(_) => MarkerState::Corrupt,
    }
}

/// Remove a file or directory tree. Returns `false` if nothing was there.
pub(crate) fn remove_entry(path: &Path) -> io::Result<bool> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
