use std::sync::Arc;
use tracing::debug;

use super::manifest::{MANIFEST_NAME, Manifest};
use super::parser::{self, ArchiveIndex};
use super::structures::{CompressionMethod, EntryRecord, LFH_SIGNATURE};
use crate::error::{Error, Result};
use crate::io::{ByteRangeSource, ReadAt};
use crate::locator::{SEPARATOR, encode_path};

/// An indexed archive rooted somewhere inside its backing source.
///
/// Root archives span their whole backing; nested archives are rooted at
/// the data offset of a stored entry in their parent and share the
/// parent's backing reader.
#[derive(Debug)]
pub struct ArchiveHandle {
    source: ByteRangeSource,
    index: ArchiveIndex,
    /// Locator of this archive without the trailing separator
    container: String,
}

impl ArchiveHandle {
    /// Index `source` as an archive addressed by `container`.
    pub fn open(source: ByteRangeSource, container: impl Into<String>) -> Result<Self> {
        if source.is_compressed() {
            return Err(Error::NotRandomAccess {
                name: source.identity().to_string(),
                offset: source.absolute_offset(),
            });
        }
        let index = ArchiveIndex::parse(&source)?;
        Ok(Self {
            source,
            index,
            container: container.into(),
        })
    }

    /// Open a whole backing source as a root archive.
    pub fn open_root(reader: Arc<dyn ReadAt>) -> Result<Self> {
        let container = reader.identity().to_string();
        Self::open(ByteRangeSource::new(reader), container)
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn source(&self) -> &ByteRangeSource {
        &self.source
    }

    /// Size of the archive's own bytes.
    pub fn size(&self) -> u64 {
        self.source.size()
    }

    /// Locator naming this archive, e.g. `file:/app.jar!/lib/x.jar`.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Canonical locator of the archive root, e.g. `file:/app.jar!/`.
    pub fn url(&self) -> String {
        format!("{}{}", self.container, SEPARATOR)
    }

    /// Canonical locator of one entry of this archive.
    pub fn entry_url(&self, name: &[u8]) -> String {
        format!("{}{}{}", self.container, SEPARATOR, encode_path(name))
    }

    pub fn entry(&self, name: impl AsRef<[u8]>) -> Option<&EntryRecord> {
        self.index.find(name)
    }

    pub fn entries(&self) -> std::slice::Iter<'_, EntryRecord> {
        self.index.entries()
    }

    /// Bytes of the named entry, or `None` if the archive has no such entry.
    ///
    /// Stored entries come back as a direct window of the archive;
    /// deflated ones as an inflating range reporting the uncompressed size.
    pub fn entry_data(&self, name: impl AsRef<[u8]>) -> Result<Option<ByteRangeSource>> {
        match self.index.find(name) {
            Some(entry) => self.record_data(entry).map(Some),
            None => Ok(None),
        }
    }

    /// Bytes of a record taken from this archive's index.
    pub fn record_data(&self, entry: &EntryRecord) -> Result<ByteRangeSource> {
        let data_offset = parser::local_data_offset(&self.source, entry)?;
        match entry.compression_method {
            CompressionMethod::Stored => self.source.sub_window(data_offset, entry.uncompressed_size),
            CompressionMethod::Deflated => Ok(self
                .source
                .sub_window(data_offset, entry.compressed_size)?
                .inflating(entry.uncompressed_size)),
            CompressionMethod::Unsupported(method) => Err(Error::UnsupportedCompression {
                archive: self.url(),
                entry: entry.name_lossy().into_owned(),
                method,
            }),
        }
    }

    /// Open a stored entry as an archive sharing this archive's backing.
    pub fn nested_archive(&self, name: impl AsRef<[u8]>) -> Result<ArchiveHandle> {
        let name = name.as_ref();
        let data = self.nested_source(name)?;
        let container = self.entry_url(name);
        debug!(archive = %container, offset = data.absolute_offset(), "opening nested archive");
        ArchiveHandle::open(data, container)
    }

    /// Raw window of an entry that is to be read as a nested archive.
    ///
    /// Fails unless the entry exists, is a file, and is stored uncompressed.
    pub fn nested_source(&self, name: impl AsRef<[u8]>) -> Result<ByteRangeSource> {
        let name = name.as_ref();
        let entry = self.index.find(name).ok_or_else(|| Error::EntryNotFound {
            archive: self.url(),
            entry: String::from_utf8_lossy(name).into_owned(),
        })?;
        if entry.is_directory {
            return Err(Error::NotAFile {
                archive: self.url(),
                entry: entry.name_lossy().into_owned(),
            });
        }
        if entry.compression_method != CompressionMethod::Stored {
            return Err(Error::CompressedNestedArchive {
                archive: self.url(),
                entry: entry.name_lossy().into_owned(),
            });
        }
        self.record_data(entry)
    }

    /// Stored entries under `prefix` whose data starts with a ZIP local header.
    ///
    /// These are the nested libraries a launcher puts on its class path.
    pub fn nested_archives(&self, prefix: &str) -> Result<Vec<&EntryRecord>> {
        let mut found = Vec::new();
        for entry in self.index.entries() {
            if entry.is_directory
                || entry.compression_method != CompressionMethod::Stored
                || !entry.name.starts_with(prefix.as_bytes())
                || entry.uncompressed_size < LFH_SIGNATURE.len() as u64
            {
                continue;
            }
            let data = self.record_data(entry)?;
            let mut magic = [0u8; 4];
            data.read_exact_at(0, &mut magic)?;
            if magic == LFH_SIGNATURE {
                found.push(entry);
            }
        }
        Ok(found)
    }

    /// Parsed manifest, or `None` when the archive has none.
    pub fn manifest(&self) -> Result<Option<Manifest>> {
        let Some(data) = self.entry_data(MANIFEST_NAME)? else {
            return Ok(None);
        };
        let bytes = data.read_to_vec()?;
        Manifest::parse(&self.url(), &bytes).map(Some)
    }
}
