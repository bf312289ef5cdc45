//! Open-stream bookkeeping.
//!
//! Every open stream gets its own backing reader (a file handle or an archive
//! handle positioned on its entry), so interleaved reads on different handles
//! never disturb each other, even when they target the same record.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::archive::{Archive, ArchiveFormat};
use crate::error::{ResourceError, ResourceResult};
use crate::io::{Filesystem, LooseFile};
use crate::record::{ResourceLocation, ResourceRecord};

/// Shared across managers so a handle can never address another manager's
/// stream.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of an open stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    fn allocate() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An opened physical source for one record.
pub(crate) enum Backing {
    Loose(Box<dyn LooseFile>),
    Archived(Box<dyn Archive>),
}

impl Backing {
    /// Open the record's storage and position it at the first byte.
    pub(crate) fn open(
        record: &ResourceRecord,
        fs: &dyn Filesystem,
        archives: &dyn ArchiveFormat,
    ) -> ResourceResult<Self> {
        match record.location() {
            ResourceLocation::Loose { file_path } => fs
                .open_for_read(file_path)
                .map(Backing::Loose)
                .map_err(|source| ResourceError::Open {
                    path: file_path.clone(),
                    source,
                }),
            ResourceLocation::Archived {
                archive_path,
                position,
                ..
            } => {
                let archive_err = |source| ResourceError::Archive {
                    path: archive_path.clone(),
                    source,
                };
                let mut archive = archives.open(archive_path).map_err(archive_err)?;
                archive.seek_to(*position).map_err(archive_err)?;
                archive.open_current_entry().map_err(archive_err)?;
                Ok(Backing::Archived(archive))
            }
        }
    }

    pub(crate) fn read(&mut self, record: &ResourceRecord, buf: &mut [u8]) -> ResourceResult<usize> {
        match self {
            Backing::Loose(file) => loop {
                match file.read(buf) {
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    result => {
                        break result.map_err(|source| ResourceError::Io {
                            name: record.relative_path().to_string(),
                            source,
                        });
                    }
                }
            },
            Backing::Archived(archive) => {
                archive
                    .read_current_entry(buf)
                    .map_err(|source| ResourceError::Archive {
                        path: archive_path(record),
                        source,
                    })
            }
        }
    }

    /// Read until `buf` is full or the source ends.
    pub(crate) fn read_fully(
        &mut self,
        record: &ResourceRecord,
        buf: &mut [u8],
    ) -> ResourceResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(record, &mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    /// Append everything up to end of stream to `out`.
    pub(crate) fn read_to_end(
        &mut self,
        record: &ResourceRecord,
        out: &mut Vec<u8>,
    ) -> ResourceResult<usize> {
        let mut chunk = [0u8; 16 * 1024];
        let mut total = 0;
        loop {
            let n = self.read(record, &mut chunk)?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&chunk[..n]);
            total += n;
        }
    }
}

impl Drop for Backing {
    fn drop(&mut self) {
        if let Backing::Archived(archive) = self {
            archive.close_current_entry();
        }
    }
}

fn archive_path(record: &ResourceRecord) -> std::path::PathBuf {
    match record.location() {
        ResourceLocation::Archived { archive_path, .. } => archive_path.clone(),
        ResourceLocation::Loose { file_path } => file_path.clone(),
    }
}

struct OpenStream {
    record: Arc<ResourceRecord>,
    backing: Backing,
}

/// Table of open streams keyed by handle.
///
/// Operations on an unknown or closed handle are no-ops that report zero
/// bytes / success.
#[derive(Default)]
pub struct StreamTable {
    open: HashMap<HandleId, OpenStream>,
}

impl StreamTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new independent stream over `record`.
    pub fn open(
        &mut self,
        record: Arc<ResourceRecord>,
        fs: &dyn Filesystem,
        archives: &dyn ArchiveFormat,
    ) -> ResourceResult<HandleId> {
        let backing = Backing::open(&record, fs, archives)?;
        let handle = HandleId::allocate();
        trace!(%handle, resource = record.relative_path(), "stream opened");
        self.open.insert(handle, OpenStream { record, backing });
        Ok(handle)
    }

    pub fn read(&mut self, handle: HandleId, buf: &mut [u8]) -> ResourceResult<usize> {
        match self.open.get_mut(&handle) {
            Some(stream) => stream.backing.read(&stream.record, buf),
            None => Ok(0),
        }
    }

    /// Reposition a loose-file stream. Archived streams only go forward.
    pub fn seek(&mut self, handle: HandleId, pos: SeekFrom) -> ResourceResult<u64> {
        let Some(stream) = self.open.get_mut(&handle) else {
            return Ok(0);
        };
        match &mut stream.backing {
            Backing::Loose(file) => file.seek(pos).map_err(|source| ResourceError::Io {
                name: stream.record.relative_path().to_string(),
                source,
            }),
            Backing::Archived(_) => Err(ResourceError::Unsupported {
                operation: "seek",
                name: stream.record.relative_path().to_string(),
            }),
        }
    }

    pub fn tell(&mut self, handle: HandleId) -> ResourceResult<u64> {
        let Some(stream) = self.open.get_mut(&handle) else {
            return Ok(0);
        };
        match &mut stream.backing {
            Backing::Loose(file) => file.stream_position().map_err(|source| ResourceError::Io {
                name: stream.record.relative_path().to_string(),
                source,
            }),
            Backing::Archived(_) => Err(ResourceError::Unsupported {
                operation: "tell",
                name: stream.record.relative_path().to_string(),
            }),
        }
    }

    /// Close `handle`, releasing its backing reader. Returns `false` if the
    /// handle was not open.
    pub fn close(&mut self, handle: HandleId) -> bool {
        match self.open.remove(&handle) {
            Some(stream) => {
                trace!(%handle, resource = stream.record.relative_path(), "stream closed");
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    fn is_open(&self, handle: HandleId) -> bool {
        self.open.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
