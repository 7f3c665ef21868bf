use std::path::PathBuf;

use fsmark_types::TypeError;

/// Errors from marker store operations.
///
/// Missing and expired markers are not errors; they surface as `false` from
/// [`exist`](crate::FsMarkStore::exist) and as no-ops from deletes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying filesystem, with the path involved.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A type-level invariant was violated (e.g. bad shard prefix length).
    #[error(transparent)]
    Type(#[from] TypeError),

    /// The background sweep task could not be joined.
    #[error("background task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
