use super::ReadAt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory backing source over a shared immutable buffer.
///
/// Used for archives embedded in the running process and for fixtures.
pub struct MemoryReader {
    bytes: Arc<[u8]>,
    identity: String,
    transferred_bytes: AtomicU64,
}

impl MemoryReader {
    /// Wrap `bytes`, naming the buffer `mem:<name>`.
    pub fn new(name: &str, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            identity: format!("mem:{}", name),
            transferred_bytes: AtomicU64::new(0),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl ReadAt for MemoryReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.bytes.len() as u64;
        if offset >= len {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.bytes.len() - start);
        buf[..n].copy_from_slice(&self.bytes[start..start + n]);
        self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_clamped_to_buffer() {
        let reader = MemoryReader::new("t", b"abcdef".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(reader.read_at(4, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(reader.read_at(6, &mut buf).unwrap(), 0);
        assert_eq!(reader.transferred_bytes(), 2);
    }

    #[test]
    fn read_exact_at_fails_past_end() {
        let reader = MemoryReader::new("t", b"abc".to_vec());
        let mut buf = [0u8; 4];
        let err = reader.read_exact_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
