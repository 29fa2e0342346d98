//! Addressable byte ranges over a shared backing source.
//!
//! A [`ByteRangeSource`] never copies data: it is an `(offset, length)`
//! window into an `Arc<dyn ReadAt>`, so every nested archive and entry
//! carved out of one file shares that file's descriptor.

use flate2::read::DeflateDecoder;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use super::ReadAt;
use crate::error::{Error, Result};

/// Immutable view over `[offset, offset + length)` of a backing source.
#[derive(Clone)]
pub struct ByteRangeSource {
    reader: Arc<dyn ReadAt>,
    offset: u64,
    length: u64,
    /// Uncompressed size when the range holds raw DEFLATE data
    inflated_size: Option<u64>,
}

impl ByteRangeSource {
    /// A range covering the whole backing source.
    pub fn new(reader: Arc<dyn ReadAt>) -> Self {
        let length = reader.size();
        Self {
            reader,
            offset: 0,
            length,
            inflated_size: None,
        }
    }

    /// Carve `[rel_offset, rel_offset + rel_length)` out of this range.
    pub fn sub_window(&self, rel_offset: u64, rel_length: u64) -> Result<Self> {
        self.ensure_random_access()?;
        let in_bounds = rel_offset
            .checked_add(rel_length)
            .is_some_and(|end| end <= self.length);
        if !in_bounds {
            return Err(Error::OutOfBounds {
                name: self.identity().to_string(),
                offset: self.offset.saturating_add(rel_offset),
                length: rel_length,
                available: self.length,
            });
        }
        Ok(Self {
            reader: Arc::clone(&self.reader),
            offset: self.offset + rel_offset,
            length: rel_length,
            inflated_size: None,
        })
    }

    /// Mark this range as DEFLATE data expanding to `uncompressed_size` bytes.
    pub(crate) fn inflating(mut self, uncompressed_size: u64) -> Self {
        self.inflated_size = Some(uncompressed_size);
        self
    }

    /// Readable size: the uncompressed size for inflating ranges.
    pub fn size(&self) -> u64 {
        self.inflated_size.unwrap_or(self.length)
    }

    /// Number of bytes this range occupies in the backing source.
    pub fn stored_size(&self) -> u64 {
        self.length
    }

    /// Absolute start of the range within the backing source.
    pub fn absolute_offset(&self) -> u64 {
        self.offset
    }

    pub fn is_compressed(&self) -> bool {
        self.inflated_size.is_some()
    }

    pub fn identity(&self) -> &str {
        self.reader.identity()
    }

    pub fn reader(&self) -> &Arc<dyn ReadAt> {
        &self.reader
    }

    /// Read exactly `buf.len()` bytes starting at `rel_offset` within the range.
    pub fn read_exact_at(&self, rel_offset: u64, buf: &mut [u8]) -> Result<()> {
        let window = self.sub_window(rel_offset, buf.len() as u64)?;
        self.reader.read_exact_at(window.offset, buf)?;
        Ok(())
    }

    /// Open a sequential stream over the readable bytes of the range.
    pub fn open_stream(&self) -> RangeStream {
        let raw = RangeReader {
            reader: Arc::clone(&self.reader),
            position: self.offset,
            end: self.offset + self.length,
        };
        match self.inflated_size {
            Some(_) => RangeStream::Inflate(DeflateDecoder::new(raw)),
            None => RangeStream::Raw(raw),
        }
    }

    /// Read the whole readable content into memory.
    pub fn read_to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size().min(usize::MAX as u64) as usize);
        self.open_stream().read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn ensure_random_access(&self) -> Result<()> {
        if self.inflated_size.is_some() {
            return Err(Error::NotRandomAccess {
                name: self.identity().to_string(),
                offset: self.offset,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ByteRangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteRangeSource")
            .field("source", &self.identity())
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("inflated_size", &self.inflated_size)
            .finish()
    }
}

/// Sequential reader over raw bytes of a range.
pub struct RangeReader {
    reader: Arc<dyn ReadAt>,
    position: u64,
    end: u64,
}

impl Read for RangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.end || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min((self.end - self.position).min(usize::MAX as u64) as usize);
        let n = self.reader.read_at(self.position, &mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{} ended at offset {} before range end {}",
                    self.reader.identity(),
                    self.position,
                    self.end
                ),
            ));
        }
        self.position += n as u64;
        Ok(n)
    }
}

/// Stream returned by [`ByteRangeSource::open_stream`].
pub enum RangeStream {
    Raw(RangeReader),
    Inflate(DeflateDecoder<RangeReader>),
}

impl Read for RangeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            RangeStream::Raw(r) => r.read(buf),
            RangeStream::Inflate(r) => r.read(buf),
        }
    }
}
