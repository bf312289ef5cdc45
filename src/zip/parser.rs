//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For reading, skip each file's Local File Header to reach its data
//!
//! A single central directory header can also be re-read by offset, which is
//! how a previously listed entry is found again without rescanning.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::archive::{ArchiveError, ArchiveResult};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser.
///
/// Generic over the reader type so archives can live on disk or in memory.
/// Typically used through [`ZipArchive`](super::ZipArchive).
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the record and its offset in the file. Handles archives with
    /// a trailing comment by searching backwards for the signature.
    pub fn find_eocd(&self) -> ArchiveResult<(EndOfCentralDirectory, u64)> {
        // Common case first: no comment, EOCD is the last 22 bytes
        if self.size >= EndOfCentralDirectory::SIZE as u64 {
            let offset = self.size - EndOfCentralDirectory::SIZE as u64;
            let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
            self.reader.read_exact_at(offset, &mut buf)?;

            if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
                let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
                return Ok((eocd, offset));
            }
        }

        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf)?;

        // The comment length field must account for every trailing byte
        for i in (0..=buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if buf.len() < EndOfCentralDirectory::SIZE {
                break;
            }
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(ArchiveError::Malformed("not a ZIP file"))
    }

    /// Read the ZIP64 End of Central Directory record, which sits behind a
    /// locator immediately before the regular EOCD.
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> ArchiveResult<Zip64EOCD> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or(ArchiveError::Malformed("missing ZIP64 locator"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader.read_exact_at(locator_offset, &mut locator_buf)?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Resolve where the central directory lives and how many entries it holds.
    pub fn locate_central_directory(&self) -> ArchiveResult<CentralDirectory> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let directory = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            CentralDirectory {
                offset: eocd64.cd_offset,
                size: eocd64.cd_size,
                total_entries: eocd64.total_entries,
            }
        } else {
            CentralDirectory {
                offset: eocd.cd_offset as u64,
                size: eocd.cd_size as u64,
                total_entries: eocd.total_entries as u64,
            }
        };

        match directory.offset.checked_add(directory.size) {
            Some(end) if end <= self.size => Ok(directory),
            _ => Err(ArchiveError::Malformed("central directory out of bounds")),
        }
    }

    /// List all entries of the central directory, in stored order.
    pub fn list_files(&self, directory: &CentralDirectory) -> ArchiveResult<Vec<ZipFileEntry>> {
        // One read for the whole directory
        let mut cd_data = vec![0u8; directory.size as usize];
        self.reader.read_exact_at(directory.offset, &mut cd_data)?;

        // total_entries comes from the file; don't trust it for preallocation
        let mut entries = Vec::with_capacity(directory.total_entries.min(4096) as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for _ in 0..directory.total_entries {
            let cdfh_offset = directory.offset + cursor.position();
            entries.push(parse_cdfh(&mut cursor, cdfh_offset)?);
        }

        Ok(entries)
    }

    /// Re-read the single central directory header stored at `cdfh_offset`.
    pub fn read_entry_at(&self, cdfh_offset: u64) -> ArchiveResult<ZipFileEntry> {
        if cdfh_offset.saturating_add(CDFH_MIN_SIZE as u64) > self.size {
            return Err(ArchiveError::Malformed("entry position out of bounds"));
        }

        let mut fixed = vec![0u8; CDFH_MIN_SIZE];
        self.reader.read_exact_at(cdfh_offset, &mut fixed)?;

        let name_len = u16::from_le_bytes([fixed[28], fixed[29]]) as usize;
        let extra_len = u16::from_le_bytes([fixed[30], fixed[31]]) as usize;
        let comment_len = u16::from_le_bytes([fixed[32], fixed[33]]) as usize;

        let mut record = vec![0u8; CDFH_MIN_SIZE + name_len + extra_len + comment_len];
        self.reader.read_exact_at(cdfh_offset, &mut record)?;

        parse_cdfh(&mut Cursor::new(record.as_slice()), cdfh_offset)
    }

    /// Offset where the entry's (possibly compressed) data begins.
    ///
    /// The Local File Header may carry different name/extra lengths than the
    /// central directory, so it has to be read to find the data.
    pub fn get_data_offset(&self, entry: &ZipFileEntry) -> ArchiveResult<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh_buf)?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(ArchiveError::Malformed("invalid local file header"));
        }

        let mut cursor = Cursor::new(lfh_buf.as_slice());
        cursor.set_position(26); // Offset to filename length field

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        let data_offset =
            entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length;

        if data_offset.saturating_add(entry.compressed_size) > self.size {
            return Err(ArchiveError::Malformed("entry data out of bounds"));
        }

        Ok(data_offset)
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

/// Parse one Central Directory File Header located at `cdfh_offset`.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>, cdfh_offset: u64) -> ArchiveResult<ZipFileEntry> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if &sig[..] != CDFH_SIGNATURE {
        return Err(ArchiveError::Malformed("invalid central directory file header"));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Non-UTF8 names are kept lossily rather than rejecting the archive
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    let extra_field_end = cursor.position() + extra_field_length as u64;

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = cursor.position() + field_size as u64;

        if header_id == 0x0001 {
            // ZIP64 fields appear only for header values saturated at 0xFFFFFFFF
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }

        cursor.set_position(field_end);
    }

    cursor.set_position(extra_field_end + file_comment_length as u64);
    if cursor.position() > cursor.get_ref().len() as u64 {
        return Err(ArchiveError::Malformed("truncated central directory file header"));
    }

    Ok(ZipFileEntry {
        file_name,
        flags,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        cdfh_offset,
    })
}
