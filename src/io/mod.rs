mod http;
mod local;
mod memory;
mod range;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::MemoryReader;
pub use range::{ByteRangeSource, RangeReader, RangeStream};

use std::io;

/// Trait for random access reading from a backing source
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the total size of the backing source
    fn size(&self) -> u64;

    /// Stable name of the backing source, used as a cache key and in errors
    fn identity(&self) -> &str;

    /// Total bytes served by this source so far
    fn transferred_bytes(&self) -> u64;

    /// Fill the whole buffer starting at `offset`, failing on a short source.
    fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(offset, buf)? {
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("{} ended at offset {}", self.identity(), offset),
                    ));
                }
                n => {
                    offset += n as u64;
                    buf = &mut buf[n..];
                }
            }
        }
        Ok(())
    }
}
