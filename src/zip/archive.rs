use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use flate2::Crc;
use flate2::read::DeflateDecoder;
use tracing::debug;

use crate::archive::{
    Archive, ArchiveEntry, ArchiveError, ArchiveFormat, ArchiveResult, EntryPosition,
};
use crate::io::{LocalFileReader, ReadAt, SectionReader};

use super::parser::ZipParser;
use super::structures::{CentralDirectory, CompressionMethod, ZipFileEntry};

/// [`ArchiveFormat`] for ZIP files on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipFormat;

impl ArchiveFormat for ZipFormat {
    fn open(&self, path: &Path) -> ArchiveResult<Box<dyn Archive>> {
        let reader = LocalFileReader::new(path)?;
        let archive = ZipArchive::new(Arc::new(reader))?;
        debug!(
            archive = %path.display(),
            entries = archive.directory.total_entries,
            "opened zip archive"
        );
        Ok(Box::new(archive))
    }
}

/// An open ZIP archive with at most one entry being streamed.
pub struct ZipArchive<R: ReadAt> {
    parser: ZipParser<R>,
    directory: CentralDirectory,
    current: Option<ZipFileEntry>,
    stream: Option<EntryStream<R>>,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Open an archive over `reader`, locating its central directory.
    pub fn new(reader: Arc<R>) -> ArchiveResult<Self> {
        let parser = ZipParser::new(reader);
        let directory = parser.locate_central_directory()?;
        Ok(Self {
            parser,
            directory,
            current: None,
            stream: None,
        })
    }

    /// Raw central directory listing, folder entries included.
    pub fn list_files(&self) -> ArchiveResult<Vec<ZipFileEntry>> {
        self.parser.list_files(&self.directory)
    }

    /// The entry selected by the last successful `seek_to`.
    pub fn current_entry(&self) -> Option<&ZipFileEntry> {
        self.current.as_ref()
    }
}

impl<R: ReadAt + 'static> Archive for ZipArchive<R> {
    fn entries(&self) -> ArchiveResult<Vec<ArchiveEntry>> {
        Ok(self
            .list_files()?
            .into_iter()
            .map(|entry| ArchiveEntry {
                path: entry.file_name,
                uncompressed_size: entry.uncompressed_size,
                position: EntryPosition::from_raw(entry.cdfh_offset),
            })
            .collect())
    }

    fn seek_to(&mut self, position: EntryPosition) -> ArchiveResult<()> {
        self.stream = None;
        self.current = None;

        let offset = position.into_raw();
        let cd_end = self.directory.offset + self.directory.size;
        if offset < self.directory.offset || offset >= cd_end {
            return Err(ArchiveError::Malformed("entry position outside central directory"));
        }

        self.current = Some(self.parser.read_entry_at(offset)?);
        Ok(())
    }

    fn open_current_entry(&mut self) -> ArchiveResult<()> {
        let entry = self.current.as_ref().ok_or(ArchiveError::NoCurrentEntry)?;

        if entry.is_encrypted() {
            return Err(ArchiveError::Encrypted(entry.file_name.clone()));
        }

        let data_offset = self.parser.get_data_offset(entry)?;
        let section = SectionReader::new(
            Arc::clone(self.parser.reader()),
            data_offset,
            entry.compressed_size,
        );

        let decoder = match entry.compression_method {
            CompressionMethod::Stored => Decoder::Stored(section),
            CompressionMethod::Deflate => Decoder::Deflate(DeflateDecoder::new(section)),
            CompressionMethod::Unknown(method) => {
                return Err(ArchiveError::UnsupportedCompression {
                    name: entry.file_name.clone(),
                    method,
                });
            }
        };

        self.stream = Some(EntryStream {
            name: entry.file_name.clone(),
            decoder,
            crc: Crc::new(),
            produced: 0,
            expected_crc: entry.crc32,
            expected_size: entry.uncompressed_size,
            finished: false,
        });
        Ok(())
    }

    fn read_current_entry(&mut self, buf: &mut [u8]) -> ArchiveResult<usize> {
        self.stream
            .as_mut()
            .ok_or(ArchiveError::EntryNotOpen)?
            .read(buf)
    }

    fn close_current_entry(&mut self) {
        self.stream = None;
    }
}

enum Decoder<R: ReadAt> {
    Stored(SectionReader<R>),
    Deflate(DeflateDecoder<SectionReader<R>>),
}

/// Forward-only decoder for one entry, verifying size and CRC-32 once the
/// declared length has been produced.
struct EntryStream<R: ReadAt> {
    name: String,
    decoder: Decoder<R>,
    crc: Crc,
    produced: u64,
    expected_crc: u32,
    expected_size: u64,
    finished: bool,
}

impl<R: ReadAt> EntryStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> ArchiveResult<usize> {
        if self.finished || buf.is_empty() {
            return Ok(0);
        }

        let want = (buf.len() as u64).min(self.expected_size - self.produced) as usize;
        if want == 0 {
            self.finish()?;
            return Ok(0);
        }

        let n = match &mut self.decoder {
            Decoder::Stored(section) => section.read(&mut buf[..want])?,
            Decoder::Deflate(inflater) => inflater.read(&mut buf[..want])?,
        };

        if n == 0 {
            self.finish()?;
            return Ok(0);
        }

        self.crc.update(&buf[..n]);
        self.produced += n as u64;
        Ok(n)
    }

    fn finish(&mut self) -> ArchiveResult<()> {
        self.finished = true;

        if self.produced != self.expected_size {
            return Err(ArchiveError::SizeMismatch {
                name: self.name.clone(),
                expected: self.expected_size,
                actual: self.produced,
            });
        }

        let actual = self.crc.sum();
        if actual != self.expected_crc {
            return Err(ArchiveError::CrcMismatch {
                name: self.name.clone(),
                expected: self.expected_crc,
                actual,
            });
        }

        Ok(())
    }
}
