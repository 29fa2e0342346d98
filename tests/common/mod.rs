//! Archive fixtures shared by the integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const MANIFEST: &str = "Manifest-Version: 1.0\n\
Main-Class: com.example.Launcher\n\
Start-Class: com.example.Application\n\
X-Long: abc\n def\n";

pub const README: &str = "nested archives are read in place, nested archives are read in place, \
nested archives are read in place";

/// Builds an archive in memory.
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn stored(self, name: &str, bytes: &[u8]) -> Self {
        self.file(name, bytes, CompressionMethod::Stored)
    }

    pub fn deflated(self, name: &str, bytes: &[u8]) -> Self {
        self.file(name, bytes, CompressionMethod::Deflated)
    }

    pub fn directory(mut self, name: &str) -> Self {
        self.writer
            .add_directory(name, SimpleFileOptions::default())
            .unwrap();
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.writer.set_comment(comment);
        self
    }

    fn file(mut self, name: &str, bytes: &[u8], method: CompressionMethod) -> Self {
        let options = SimpleFileOptions::default().compression_method(method);
        self.writer.start_file(name, options).unwrap();
        self.writer.write_all(bytes).unwrap();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.finish().unwrap().into_inner()
    }
}

/// `greeting.txt` plus a second level nested archive.
pub fn library_archive() -> Vec<u8> {
    let deepest = ArchiveBuilder::new().stored("leaf.txt", b"leaf").finish();
    ArchiveBuilder::new()
        .stored("greeting.txt", b"hello")
        .stored("deep/z.jar", &deepest)
        .finish()
}

/// The application archive used throughout the tests:
///
/// - `app.txt` (stored, "hi there")
/// - `lib/x.jar` (stored nested archive holding `greeting.txt`)
/// - `lib/y.jar` (deflated nested archive)
/// - `lib/notes.txt` (stored, not an archive)
/// - `docs/readme.txt` (deflated)
/// - `META-INF/MANIFEST.MF`
pub fn application_archive() -> Vec<u8> {
    let library = library_archive();
    ArchiveBuilder::new()
        .stored("META-INF/MANIFEST.MF", MANIFEST.as_bytes())
        .stored("app.txt", b"hi there")
        .directory("lib/")
        .stored("lib/x.jar", &library)
        .deflated("lib/y.jar", &library)
        .stored("lib/notes.txt", b"not an archive")
        .deflated("docs/readme.txt", README.as_bytes())
        .finish()
}

/// `lib/x.jar` holding only `greeting.txt`; same layout for any 5 byte text.
pub fn greeting_archive(text: &[u8; 5]) -> Vec<u8> {
    let library = ArchiveBuilder::new().stored("greeting.txt", text).finish();
    ArchiveBuilder::new().stored("lib/x.jar", &library).finish()
}

/// Overwrite the compression method of `name` in both of its headers.
pub fn set_compression_method(bytes: &mut [u8], name: &str, method: u16) {
    let name = name.as_bytes();
    let mut patched = 0;
    for i in 0..bytes.len().saturating_sub(4) {
        let (method_at, name_len_at, name_at) = match &bytes[i..i + 4] {
            b"PK\x03\x04" => (i + 8, i + 26, i + 30),
            b"PK\x01\x02" => (i + 10, i + 28, i + 46),
            _ => continue,
        };
        if name_at + name.len() > bytes.len() {
            continue;
        }
        let name_len = u16::from_le_bytes([bytes[name_len_at], bytes[name_len_at + 1]]) as usize;
        if name_len == name.len() && &bytes[name_at..name_at + name.len()] == name {
            bytes[method_at..method_at + 2].copy_from_slice(&method.to_le_bytes());
            patched += 1;
        }
    }
    assert_eq!(patched, 2, "expected a local and a central header for the entry");
}

/// Offset of the end of central directory record of an archive without comment.
pub fn eocd_offset(bytes: &[u8]) -> usize {
    let offset = bytes.len() - 22;
    assert_eq!(&bytes[offset..offset + 4], b"PK\x05\x06");
    offset
}
