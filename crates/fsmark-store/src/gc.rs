//! Garbage collection of expired markers and stray entries.
//!
//! A sweep walks the tree depth-first with children before parents, so a
//! shard emptied during a sweep is reclaimed by that same sweep. Every
//! removal decision is re-checked under the store's exclusive lock, which is
//! what keeps a concurrently recreated marker alive.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::Instant;

use fsmark_types::now_nanos;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{StoreError, StoreResult};
use crate::fs::{classify, remove_entry, FsMarkStore};

/// Outcome of one sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Expired or corrupt markers removed.
    pub markers_removed: usize,
    /// Empty shard directories removed.
    pub shards_removed: usize,
    /// Entries that do not belong in the layout, removed.
    pub foreign_removed: usize,
    /// Entries that could not be removed.
    pub failures: usize,
}

impl GcReport {
    pub fn total_removed(&self) -> usize {
        self.markers_removed + self.shards_removed + self.foreign_removed
    }
}

#[derive(Clone, Copy, Debug)]
enum Removal {
    Marker,
    Shard,
    Foreign,
}

impl FsMarkStore {
    /// Run one synchronous sweep over the whole tree.
    ///
    /// Fails only if the root exists but is not a listable directory.
    /// Problems with individual entries are logged and counted in the report.
    pub fn gc(&self) -> StoreResult<GcReport> {
        let started = Instant::now();
        let root = self.root();
        let mut report = GcReport::default();

        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(StoreError::io(
                    root,
                    io::Error::new(ErrorKind::Other, "store root is not a directory"),
                ))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(StoreError::io(root, e)),
        }

        let walker = WalkDir::new(root)
            .max_depth(2)
            .contents_first(true)
            .follow_links(false);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf);
                    if err.depth() == 0 || path.as_deref() == Some(root) {
                        let source = io::Error::from(err);
                        if source.kind() == ErrorKind::NotFound {
                            return Ok(report);
                        }
                        return Err(StoreError::io(root, source));
                    }
                    match path {
                        Some(path) => {
                            warn!(path = %path.display(), error = %err, "unreadable entry; removing");
                            self.remove_if(&path, Removal::Foreign, &mut report, |_| true);
                        }
                        None => report.failures += 1,
                    }
                    continue;
                }
            };

            match entry.depth() {
                0 => {}
                1 => self.sweep_top_level(&entry, &mut report),
                _ => self.sweep_shard_entry(&entry, &mut report),
            }
        }

        info!(
            root = %root.display(),
            markers = report.markers_removed,
            shards = report.shards_removed,
            foreign = report.foreign_removed,
            failures = report.failures,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "gc sweep finished"
        );
        Ok(report)
    }

    /// Entries directly under the root: only shard directories belong here.
    fn sweep_top_level(&self, entry: &DirEntry, report: &mut GcReport) {
        let is_shard = entry.file_type().is_dir() && self.sharder().is_shard_name(&name_of(entry));
        if !is_shard {
            self.remove_if(entry.path(), Removal::Foreign, report, |path| {
                self.is_foreign_top_level(path)
            });
            return;
        }
        self.remove_if(entry.path(), Removal::Shard, report, is_empty_dir);
    }

    /// Entries inside a directory at depth one. Children of foreign
    /// directories are skipped; their parent is removed wholesale next.
    fn sweep_shard_entry(&self, entry: &DirEntry, report: &mut GcReport) {
        let parent_is_shard = entry
            .path()
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.sharder().is_shard_name(name));
        if !parent_is_shard {
            return;
        }

        let is_leaf = entry.file_type().is_file() && self.sharder().is_leaf_name(&name_of(entry));
        if !is_leaf {
            self.remove_if(entry.path(), Removal::Foreign, report, |path| {
                self.is_foreign_in_shard(path)
            });
            return;
        }

        let stale = {
            let _guard = self.read_lock();
            classify(entry.path(), now_nanos()).is_stale()
        };
        if stale {
            self.remove_if(entry.path(), Removal::Marker, report, |path| {
                classify(path, now_nanos()).is_stale()
            });
        }
    }

    /// A create may have turned the entry into a valid shard since the walk
    /// listed it, so this looks at the disk again rather than the listing.
    fn is_foreign_top_level(&self, path: &Path) -> bool {
        match fs::symlink_metadata(path) {
            Ok(meta) => !(meta.is_dir() && name_matches(path, |n| self.sharder().is_shard_name(n))),
            Err(e) => e.kind() != ErrorKind::NotFound,
        }
    }

    /// Same as [`Self::is_foreign_top_level`] for entries inside a shard.
    fn is_foreign_in_shard(&self, path: &Path) -> bool {
        match fs::symlink_metadata(path) {
            Ok(meta) => !(meta.is_file() && name_matches(path, |n| self.sharder().is_leaf_name(n))),
            Err(e) => e.kind() != ErrorKind::NotFound,
        }
    }

    /// Take the exclusive lock, re-check `still_applies`, then remove.
    fn remove_if(
        &self,
        path: &Path,
        kind: Removal,
        report: &mut GcReport,
        still_applies: impl Fn(&Path) -> bool,
    ) {
        let _guard = self.write_lock();
        if !still_applies(path) {
            return;
        }

        let result = match kind {
            Removal::Shard => fs::remove_dir(path).map(|()| true),
            Removal::Marker | Removal::Foreign => remove_entry(path),
        };
        match result {
            Ok(true) => {
                debug!(path = %path.display(), ?kind, "gc removed entry");
                match kind {
                    Removal::Marker => report.markers_removed += 1,
                    Removal::Shard => report.shards_removed += 1,
                    Removal::Foreign => report.foreign_removed += 1,
                }
            }
            Ok(false) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), ?kind, error = %e, "gc failed to remove entry");
                report.failures += 1;
            }
        }
    }
}

fn name_of(entry: &DirEntry) -> String {
    entry.file_name().to_string_lossy().into_owned()
}

fn name_matches(path: &Path, check: impl Fn(&str) -> bool) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(check)
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
