//! # nestjar
//!
//! Random access to entries of nested ZIP archives without extracting them.
//!
//! A "fat" application archive stores its libraries as uncompressed
//! archives inside itself. This library indexes such an archive in place,
//! exposes any entry (at any nesting depth) as a byte range of the one
//! underlying file, and addresses entries with locator strings like
//! `file:/srv/app.jar!/lib/x.jar!/greeting.txt`.
//!
//! ## Features
//!
//! - Root archives from local files, in-memory buffers or HTTP Range requests
//! - Nested archives indexed in place, sharing their root's file handle
//! - STORED and DEFLATE entries, ZIP64, archives with prepended launch scripts
//! - Manifest parsing with continuation lines and per-entry sections
//! - A shared cache so every nested archive is parsed once
//!
//! ## Example
//!
//! ```no_run
//! use std::io::Read;
//! use nestjar::Resolver;
//!
//! fn main() -> nestjar::Result<()> {
//!     let resolver = Resolver::default();
//!     let mut connection =
//!         resolver.connection("file:/srv/app.jar!/lib/x.jar!/greeting.txt")?;
//!
//!     let mut text = String::new();
//!     connection.open_stream()?.read_to_string(&mut text)?;
//!     println!("{} bytes: {}", connection.content_length()?, text);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod io;
pub mod locator;
pub mod logging;
pub mod resolver;
pub mod zip;

pub use cache::ArchiveCache;
pub use cli::Cli;
pub use config::ResolverConfig;
pub use connection::ResourceConnection;
pub use error::{Error, Result};
pub use io::{ByteRangeSource, HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use locator::{EntryLocator, decode_path, encode_path};
pub use resolver::Resolver;
pub use crate::zip::{ArchiveHandle, ArchiveIndex, CompressionMethod, EntryRecord, Manifest};
