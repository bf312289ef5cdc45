use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::Path;

/// A directory entry as seen by the discovery walk.
///
/// `name` is the name exactly as the OS reports it, so joining it onto the
/// parent always yields an openable path even when it is not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub name: OsString,
    pub is_directory: bool,
}

impl FsEntry {
    pub fn file(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
        }
    }

    pub fn directory(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
        }
    }
}

/// An open loose file: sequential reads plus random seeks.
pub trait LooseFile: Read + Seek + Send {}

impl<T: Read + Seek + Send> LooseFile for T {}

/// Filesystem access needed to discover and open loose resources.
///
/// The manager never touches `std::fs` directly, so hosts can substitute
/// a sandboxed or in-memory tree.
pub trait Filesystem: Send + Sync {
    /// List the immediate children of `dir`.
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<FsEntry>>;

    /// Current size of the file at `path`.
    fn stat(&self, path: &Path) -> io::Result<u64>;

    /// Open `path` for binary reading.
    fn open_for_read(&self, path: &Path) -> io::Result<Box<dyn LooseFile>>;
}

/// [`Filesystem`] backed by the host operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<FsEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // file_type() does not follow symlinks; a symlinked directory
            // should still be walked
            let is_directory = entry.path().is_dir();
            entries.push(FsEntry {
                name: entry.file_name(),
                is_directory,
            });
        }
        // read_dir order is platform dependent
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn stat(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn open_for_read(&self, path: &Path) -> io::Result<Box<dyn LooseFile>> {
        Ok(Box::new(File::open(path)?))
    }
}
