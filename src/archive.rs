//! Archive reader contract.
//!
//! The resource manager only needs four things from a container format:
//! list entries, remember where each one lives, jump back to it later, and
//! stream its decompressed bytes forward. [`ArchiveFormat`] opens an archive,
//! [`Archive`] is the open handle. Dropping the handle closes the archive.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors raised by archive readers.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed archive: {0}")]
    Malformed(&'static str),

    #[error("unsupported compression method {method} for '{name}'")]
    UnsupportedCompression { name: String, method: u16 },

    #[error("entry '{0}' is encrypted")]
    Encrypted(String),

    #[error("CRC mismatch for '{name}': expected {expected:08x}, got {actual:08x}")]
    CrcMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("size mismatch for '{name}': declared {expected} bytes, decoded {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("no current entry (seek to an entry first)")]
    NoCurrentEntry,

    #[error("current entry is not open")]
    EntryNotOpen,
}

/// Opaque marker locating one entry inside its archive.
///
/// Produced by [`Archive::entries`] and handed back verbatim to
/// [`Archive::seek_to`]. Only the format that produced it may interpret the
/// raw value.
#[derive(Debug, Clone, Copy)]
pub struct EntryPosition(u64);

impl EntryPosition {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn into_raw(self) -> u64 {
        self.0
    }
}

/// One entry as listed by [`Archive::entries`].
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path inside the archive, as stored (folder markers end with a separator).
    pub path: String,
    pub uncompressed_size: u64,
    pub position: EntryPosition,
}

impl ArchiveEntry {
    pub fn is_folder_marker(&self) -> bool {
        self.path.ends_with('/') || self.path.ends_with('\\')
    }
}

/// An open archive handle.
///
/// Reading is a small state machine: [`seek_to`](Archive::seek_to) selects
/// the current entry, [`open_current_entry`](Archive::open_current_entry)
/// starts decoding it, [`read_current_entry`](Archive::read_current_entry)
/// streams forward only, [`close_current_entry`](Archive::close_current_entry)
/// releases the decoder.
pub trait Archive: Send {
    /// Enumerate every entry in directory order.
    fn entries(&self) -> ArchiveResult<Vec<ArchiveEntry>>;

    /// Make the entry at `position` current, closing any open entry.
    fn seek_to(&mut self, position: EntryPosition) -> ArchiveResult<()>;

    /// Start streaming the current entry from its first byte.
    fn open_current_entry(&mut self) -> ArchiveResult<()>;

    /// Read decompressed bytes from the open entry; `Ok(0)` at its end.
    fn read_current_entry(&mut self, buf: &mut [u8]) -> ArchiveResult<usize>;

    /// Release the open entry, if any.
    fn close_current_entry(&mut self);
}

/// Opens archives of one container format.
pub trait ArchiveFormat: Send + Sync {
    fn open(&self, path: &Path) -> ArchiveResult<Box<dyn Archive>>;
}
