use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Result type for nested archive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while indexing, addressing or reading nested archives.
///
/// Every variant names the archive (or backing source) involved so a
/// failure can be diagnosed without re-parsing. The type is `Clone` so a
/// failed [`ResourceConnection`](crate::ResourceConnection) can hand the
/// same error back on every later call.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("range {offset}+{length} exceeds the {available} bytes available in {name}")]
    OutOfBounds {
        name: String,
        offset: u64,
        length: u64,
        available: u64,
    },

    #[error("malformed archive {archive} at offset {offset}: {reason}")]
    MalformedArchive {
        archive: String,
        offset: u64,
        reason: String,
    },

    #[error("entry {entry} in {archive} uses unsupported compression method {method}")]
    UnsupportedCompression {
        archive: String,
        entry: String,
        method: u16,
    },

    #[error("nested archive {entry} in {archive} is compressed; nested archives must be stored")]
    CompressedNestedArchive { archive: String, entry: String },

    #[error("range at offset {offset} of {name} is compressed and only supports sequential reads")]
    NotRandomAccess { name: String, offset: u64 },

    #[error("malformed locator {locator:?}: {reason}")]
    MalformedLocator { locator: String, reason: String },

    #[error("entry {entry} not found in {archive}")]
    EntryNotFound { archive: String, entry: String },

    #[error("entry {entry} in {archive} is a directory")]
    NotAFile { archive: String, entry: String },

    #[error("malformed manifest in {archive} at line {line}: {reason}")]
    MalformedManifest {
        archive: String,
        line: usize,
        reason: String,
    },

    #[error("no backing source for container {container:?}")]
    UnknownSource { container: String },

    #[error("remote source {url}: {reason}")]
    Remote { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl Error {
    pub(crate) fn malformed(archive: &str, offset: u64, reason: impl Into<String>) -> Self {
        Error::MalformedArchive {
            archive: archive.to_string(),
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn locator(locator: &str, reason: impl Into<String>) -> Self {
        Error::MalformedLocator {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller asked for something that is simply absent,
    /// as opposed to a structural failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::EntryNotFound { .. } | Error::NotAFile { .. })
    }
}
