//! ZIP archive indexing and entry access.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Central directory parsing into an [`ArchiveIndex`]
//! - [`archive`]: [`ArchiveHandle`], resolving entry names to byte ranges
//! - [`manifest`]: `META-INF/MANIFEST.MF` parsing
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first, then the Central Directory. Entry data is
//! never read until asked for, and a stored entry holding another
//! archive can be indexed in place without copying it out.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - Archives with prepended bytes (launch scripts)
//! - STORED and DEFLATE compression methods
//!
//! ## Limitations
//!
//! - Read only
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod archive;
mod manifest;
mod parser;
mod structures;

pub use archive::ArchiveHandle;
pub use manifest::{
    Attributes, MAIN_CLASS_ATTRIBUTE, MANIFEST_NAME, Manifest, START_CLASS_ATTRIBUTE,
};
pub use parser::ArchiveIndex;
pub use structures::*;
