use std::path::{Path, PathBuf};

use fsmark_types::{is_hex_name, KeyDigest, ShardPrefixLen};

/// Maps marker keys to `<root>/<shard>/<leaf>` paths.
///
/// Pure and deterministic: the same key always maps to the same path, and
/// every path lies directly two levels beneath the root.
#[derive(Clone, Debug)]
pub struct PathSharder {
    root: PathBuf,
    prefix_len: ShardPrefixLen,
}

impl PathSharder {
    pub fn new(root: impl Into<PathBuf>, prefix_len: ShardPrefixLen) -> Self {
        Self {
            root: root.into(),
            prefix_len,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix_len(&self) -> ShardPrefixLen {
        self.prefix_len
    }

    /// Marker path for `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        let (shard, leaf) = KeyDigest::sha256(key).split(self.prefix_len);
        self.root.join(shard).join(leaf)
    }

    /// Returns `true` if `name` could be a shard directory under this root.
    pub fn is_shard_name(&self, name: &str) -> bool {
        is_hex_name(name, self.prefix_len.get())
    }

    /// Returns `true` if `name` could be a marker file inside a shard.
    pub fn is_leaf_name(&self, name: &str) -> bool {
        is_hex_name(name, self.prefix_len.leaf_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sharder() -> PathSharder {
        PathSharder::new("/srv/marks", ShardPrefixLen::default())
    }

    #[test]
    fn path_of_empty_key() {
        let path = sharder().path("");
        assert_eq!(
            path,
            PathBuf::from(
                "/srv/marks/e3b0/c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
            )
        );
    }

    #[test]
    fn wider_prefix_moves_the_split() {
        let sharder = PathSharder::new("/srv/marks", ShardPrefixLen::new(8).unwrap());
        let path = sharder.path("");
        assert_eq!(path.parent().unwrap(), Path::new("/srv/marks/e3b0c442"));
        assert!(sharder.is_leaf_name(path.file_name().unwrap().to_str().unwrap()));
    }

    #[test]
    fn shard_and_leaf_names() {
        let s = sharder();
        assert!(s.is_shard_name("00ff"));
        assert!(!s.is_shard_name("00ff0"));
        assert!(s.is_leaf_name(&"a".repeat(60)));
        assert!(!s.is_leaf_name(&"a".repeat(59)));
    }

    proptest! {
        #[test]
        fn path_is_deterministic_and_under_root(key in ".*") {
            let s = sharder();
            let first = s.path(&key);
            prop_assert_eq!(&first, &s.path(&key));
            prop_assert!(first.starts_with(s.root()));
            let shard = first.parent().unwrap();
            prop_assert_eq!(shard.parent().unwrap(), s.root());
            prop_assert!(s.is_shard_name(shard.file_name().unwrap().to_str().unwrap()));
            prop_assert!(s.is_leaf_name(first.file_name().unwrap().to_str().unwrap()));
        }
    }
}
