//! Lazily connected handle on one locator.

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::RangeStream;
use crate::locator::EntryLocator;
use crate::resolver::Resolver;
use crate::zip::{ArchiveHandle, EntryRecord, Manifest};

/// Content type reported for a locator naming an archive root
pub const ARCHIVE_CONTENT_TYPE: &str = "application/java-archive";

/// Content type reported when the entry name gives no hint
pub const UNKNOWN_CONTENT_TYPE: &str = "content/unknown";

/// A resource addressed by an [`EntryLocator`].
///
/// Nothing is read until an accessor needs resolved state. The first
/// such call connects; its outcome, success or failure, is kept and
/// returned by every later call without touching storage again.
pub struct ResourceConnection {
    resolver: Resolver,
    locator: EntryLocator,
    state: Option<Result<Resolved>>,
}

struct Resolved {
    archive: Arc<ArchiveHandle>,
    entry: Option<EntryRecord>,
}

impl ResourceConnection {
    pub fn new(resolver: Resolver, locator: EntryLocator) -> Self {
        Self {
            resolver,
            locator,
            state: None,
        }
    }

    pub fn locator(&self) -> &EntryLocator {
        &self.locator
    }

    /// Terminal entry name, or `None` for an archive locator.
    pub fn entry_name(&self) -> Option<&[u8]> {
        self.locator.entry()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, Some(Ok(_)))
    }

    /// Resolve the locator. Later calls are no-ops that repeat the outcome.
    pub fn connect(&mut self) -> Result<()> {
        self.resolved().map(|_| ())
    }

    fn resolved(&mut self) -> Result<&Resolved> {
        let state = self
            .state
            .get_or_insert_with(|| resolve(&self.resolver, &self.locator));
        state.as_ref().map_err(Clone::clone)
    }

    /// Archive holding the terminal entry (or named by the locator).
    pub fn archive(&mut self) -> Result<&Arc<ArchiveHandle>> {
        Ok(&self.resolved()?.archive)
    }

    /// Record of the terminal entry; `None` for an archive locator.
    pub fn entry_record(&mut self) -> Result<Option<&EntryRecord>> {
        Ok(self.resolved()?.entry.as_ref())
    }

    /// Readable size: the entry's uncompressed size or the archive's size.
    pub fn content_length(&mut self) -> Result<u64> {
        let resolved = self.resolved()?;
        Ok(match &resolved.entry {
            Some(entry) => entry.uncompressed_size,
            None => resolved.archive.size(),
        })
    }

    /// Manifest of the resolved archive.
    pub fn manifest(&mut self) -> Result<Option<Manifest>> {
        self.resolved()?.archive.manifest()
    }

    /// Stream the entry's bytes, inflating if needed.
    ///
    /// An archive locator streams the archive's own bytes.
    pub fn open_stream(&mut self) -> Result<RangeStream> {
        let resolved = self.resolved()?;
        match &resolved.entry {
            Some(entry) if entry.is_directory => Err(Error::NotAFile {
                archive: resolved.archive.url(),
                entry: entry.name_lossy().into_owned(),
            }),
            Some(entry) => Ok(resolved.archive.record_data(entry)?.open_stream()),
            None => Ok(resolved.archive.source().open_stream()),
        }
    }

    /// Guess the content type from the locator alone, without I/O.
    pub fn content_type(&self) -> &'static str {
        match self.locator.entry() {
            None => ARCHIVE_CONTENT_TYPE,
            Some(name) => guess_content_type(name),
        }
    }
}

fn resolve(resolver: &Resolver, locator: &EntryLocator) -> Result<Resolved> {
    let archive = resolver.resolve_archive(locator)?;
    let entry = match locator.entry() {
        Some(name) => Some(find_entry(&archive, name)?.clone()),
        None => None,
    };
    debug!(locator = %locator, archive = %archive.url(), "connected");
    Ok(Resolved { archive, entry })
}

/// Exact lookup, falling back to the directory entry `name/`.
fn find_entry<'a>(archive: &'a ArchiveHandle, name: &[u8]) -> Result<&'a EntryRecord> {
    if let Some(entry) = archive.entry(name) {
        return Ok(entry);
    }
    if name.last() != Some(&b'/') {
        let mut directory = name.to_vec();
        directory.push(b'/');
        if let Some(entry) = archive.entry(&directory) {
            return Ok(entry);
        }
    }
    Err(Error::EntryNotFound {
        archive: archive.url(),
        entry: String::from_utf8_lossy(name).into_owned(),
    })
}

fn guess_content_type(name: &[u8]) -> &'static str {
    let name = String::from_utf8_lossy(name);
    let extension = Path::new(name.as_ref())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jar") | Some("war") => ARCHIVE_CONTENT_TYPE,
        Some("zip") => "application/zip",
        Some("class") => "application/java-vm",
        Some("txt") | Some("properties") | Some("mf") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("yml") | Some("yaml") => "application/yaml",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => UNKNOWN_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_comes_from_the_name() {
        let resolver = Resolver::default();
        let connection = |s: &str| resolver.connection(s).unwrap();
        assert_eq!(connection("mem:a!/").content_type(), ARCHIVE_CONTENT_TYPE);
        assert_eq!(connection("mem:a!/static/index.HTML").content_type(), "text/html");
        assert_eq!(connection("mem:a!/com/example/A.class").content_type(), "application/java-vm");
        assert_eq!(connection("mem:a!/README").content_type(), UNKNOWN_CONTENT_TYPE);
    }
}
