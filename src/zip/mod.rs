//! ZIP backend for the [`Archive`](crate::archive::Archive) contract.
//!
//! Opening an archive reads only its tail: the End of Central Directory
//! record (or its ZIP64 counterpart) points at the central directory, which
//! lists every entry with its sizes, CRC and local header offset. Entry data
//! is decoded lazily when an entry is opened.
//!
//! An entry's [`EntryPosition`](crate::archive::EntryPosition) is the offset
//! of its central directory header. Seeking back to an entry re-reads that
//! one header, so it survives closing and reopening the archive.
//!
//! Handled: ZIP64 sizes and offsets, archive comments, STORED and DEFLATE.
//! Encrypted entries, multi-disk sets and other methods are listed but fail
//! to open.

mod archive;
mod parser;
mod structures;

pub use archive::{ZipArchive, ZipFormat};
pub use parser::ZipParser;
pub use structures::*;
