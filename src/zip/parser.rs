//! Central directory parser.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the range's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory in one request and parse every record
//!
//! All offsets are taken relative to the start of the [`ByteRangeSource`]
//! being indexed, never to the backing file, which is what lets a nested
//! archive be indexed in place inside its parent.

use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::{self, Cursor, Read};
use tracing::{debug, warn};

use super::structures::*;
use crate::error::{Error, Result};
use crate::io::ByteRangeSource;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Extra field id of the ZIP64 extended information block
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Parsed central directory of one archive.
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    entries: Vec<EntryRecord>,
    lookup: HashMap<Vec<u8>, usize>,
    base_offset: u64,
    cd_offset: u64,
}

impl ArchiveIndex {
    /// Locate the EOCD of `source` and index its central directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedArchive`] if no EOCD signature is found,
    /// if the declared directory does not fit in the range, or if the
    /// records do not add up to the declared directory size.
    pub fn parse(source: &ByteRangeSource) -> Result<Self> {
        let archive = source.identity();
        let (eocd, eocd_offset) = find_eocd(source)?;

        // Get Central Directory info, using ZIP64 if needed
        let (declared_cd_offset, cd_size, total_entries, cd_end) = if eocd.is_zip64() {
            let (eocd64, eocd64_offset) = read_zip64_eocd(source, eocd_offset)?;
            (
                eocd64.cd_offset,
                eocd64.cd_size,
                eocd64.total_entries,
                eocd64_offset,
            )
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
                eocd_offset,
            )
        };

        if cd_size > cd_end {
            return Err(Error::malformed(
                archive,
                eocd_offset,
                format!("central directory size {} exceeds its end offset {}", cd_size, cd_end),
            ));
        }
        let cd_offset = cd_end - cd_size;
        if declared_cd_offset > cd_offset {
            return Err(Error::malformed(
                archive,
                eocd_offset,
                format!(
                    "central directory offset {} lies past the directory itself at {}",
                    declared_cd_offset, cd_offset
                ),
            ));
        }
        // Bytes prepended to the archive shift every recorded offset
        let base_offset = cd_offset - declared_cd_offset;

        if total_entries.saturating_mul(CDFH_MIN_SIZE as u64) > cd_size {
            return Err(Error::malformed(
                archive,
                cd_offset,
                format!(
                    "{} entries cannot fit in a central directory of {} bytes",
                    total_entries, cd_size
                ),
            ));
        }

        // Read the entire Central Directory in one request
        let mut cd_data = vec![0u8; cd_size as usize];
        source.read_exact_at(cd_offset, &mut cd_data)?;

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut lookup = HashMap::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..total_entries {
            let record_offset = cd_offset + cursor.position();
            let mut entry = parse_cdfh(&mut cursor).map_err(|e| {
                Error::malformed(
                    archive,
                    record_offset,
                    format!("central directory record {}: {}", index, e),
                )
            })?;
            entry.local_header_offset = entry
                .local_header_offset
                .checked_add(base_offset)
                .ok_or_else(|| {
                    Error::malformed(
                        archive,
                        record_offset,
                        format!(
                            "local header offset of {} overflows past the prefix",
                            entry.name_lossy()
                        ),
                    )
                })?;

            match lookup.entry(entry.name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(entries.len());
                }
                Entry::Occupied(_) => {
                    warn!(archive, entry = %entry.name_lossy(), "duplicate entry name, keeping the first");
                }
            }
            entries.push(entry);
        }

        if cursor.position() != cd_size {
            return Err(Error::malformed(
                archive,
                cd_offset,
                format!(
                    "{} records span {} bytes but the central directory declares {}",
                    total_entries,
                    cursor.position(),
                    cd_size
                ),
            ));
        }

        debug!(
            archive,
            offset = source.absolute_offset(),
            entries = entries.len(),
            cd_offset,
            base_offset,
            "indexed central directory"
        );

        Ok(Self {
            entries,
            lookup,
            base_offset,
            cd_offset,
        })
    }

    /// Exact, case-sensitive lookup by raw entry name.
    pub fn find(&self, name: impl AsRef<[u8]>) -> Option<&EntryRecord> {
        self.lookup.get(name.as_ref()).map(|&i| &self.entries[i])
    }

    /// All records in central directory order.
    pub fn entries(&self) -> std::slice::Iter<'_, EntryRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of bytes preceding the archive proper within its range.
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Position of the central directory within the range.
    pub fn central_directory_offset(&self) -> u64 {
        self.cd_offset
    }
}

/// Find and parse the End of Central Directory record.
///
/// Handles both the simple case (no comment) and archives with
/// comments by searching backwards for the signature. Returns the
/// record and its offset within `source`.
fn find_eocd(source: &ByteRangeSource) -> Result<(EndOfCentralDirectory, u64)> {
    let size = source.size();
    let archive = source.identity();
    let eocd_size = EndOfCentralDirectory::SIZE as u64;

    if size < eocd_size {
        return Err(Error::malformed(
            archive,
            0,
            format!("{} bytes is too small to hold an end of central directory record", size),
        ));
    }

    // Optimization: First try the simple case where there's no comment.
    let offset = size - eocd_size;
    let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
    source.read_exact_at(offset, &mut buf)?;
    if &buf[20..22] == b"\x00\x00" {
        if let Some(eocd) = EndOfCentralDirectory::from_bytes(&buf) {
            return Ok((eocd, offset));
        }
    }

    // EOCD not at expected location - search backwards through the
    // largest possible comment.
    let search_size = (MAX_COMMENT_SIZE + eocd_size).min(size);
    let search_start = size - search_size;

    let mut buf = vec![0u8; search_size as usize];
    source.read_exact_at(search_start, &mut buf)?;

    for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
        if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
            // The comment length field must account for the remaining bytes
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                if let Some(eocd) =
                    EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])
                {
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }
    }

    Err(Error::malformed(
        archive,
        search_start,
        "end of central directory signature not found",
    ))
}

/// Read the ZIP64 End of Central Directory record.
///
/// The locator sits immediately before the regular EOCD. When the
/// archive has a prefix the declared record offset is stale, so the
/// position directly before the locator is tried as well.
fn read_zip64_eocd(source: &ByteRangeSource, eocd_offset: u64) -> Result<(Zip64EOCD, u64)> {
    let archive = source.identity();
    let locator_offset = eocd_offset
        .checked_sub(Zip64EOCDLocator::SIZE as u64)
        .ok_or_else(|| Error::malformed(archive, eocd_offset, "missing ZIP64 locator"))?;

    let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
    source.read_exact_at(locator_offset, &mut locator_buf)?;
    let locator = Zip64EOCDLocator::from_bytes(&locator_buf)
        .ok_or_else(|| Error::malformed(archive, locator_offset, "invalid ZIP64 locator"))?;

    let candidates = [
        Some(locator.eocd64_offset),
        locator_offset.checked_sub(Zip64EOCD::MIN_SIZE as u64),
    ];
    for candidate in candidates.into_iter().flatten() {
        let fits = candidate
            .checked_add(Zip64EOCD::MIN_SIZE as u64)
            .is_some_and(|end| end <= locator_offset);
        if !fits {
            continue;
        }
        let mut buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        source.read_exact_at(candidate, &mut buf)?;
        if let Some(eocd64) = Zip64EOCD::from_bytes(&buf) {
            return Ok((eocd64, candidate));
        }
    }

    Err(Error::malformed(
        archive,
        locator.eocd64_offset,
        "ZIP64 end of central directory record not found",
    ))
}

/// Parse a Central Directory File Header from a cursor.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> io::Result<EntryRecord> {
    // Read and verify the signature (PK\x01\x02)
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid central directory file header signature",
        ));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut local_header_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut name = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut name)?;

    // Directory entries end with '/'
    let is_directory = name.last() == Some(&b'/');

    let extra_field_end = cursor.position() + extra_field_length as u64;

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = cursor.position() + field_size as u64;

        if header_id == ZIP64_EXTRA_ID {
            // Fields are present only if the header field is saturated
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if local_header_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                local_header_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }
        cursor.set_position(field_end);
    }

    cursor.set_position(extra_field_end + file_comment_length as u64);
    if cursor.position() > cursor.get_ref().len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "record extends past the central directory",
        ));
    }

    Ok(EntryRecord {
        name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        local_header_offset,
        flags,
        last_mod_time,
        last_mod_date,
        is_directory,
    })
}

/// Offset of the entry data relative to its local file header.
///
/// The local header carries its own name and extra field lengths, which
/// may differ from the central directory copy.
pub(crate) fn local_data_offset(source: &ByteRangeSource, entry: &EntryRecord) -> Result<u64> {
    let mut lfh_buf = [0u8; LFH_SIZE];
    source.read_exact_at(entry.local_header_offset, &mut lfh_buf)?;

    if &lfh_buf[0..4] != LFH_SIGNATURE {
        return Err(Error::malformed(
            source.identity(),
            entry.local_header_offset,
            format!("invalid local file header for {}", entry.name_lossy()),
        ));
    }

    let file_name_length = u16::from_le_bytes([lfh_buf[26], lfh_buf[27]]) as u64;
    let extra_field_length = u16::from_le_bytes([lfh_buf[28], lfh_buf[29]]) as u64;

    Ok(entry.local_header_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
}
