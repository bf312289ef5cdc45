//! The resource manager: discovery, overlay configuration, lazy indexing,
//! lookups and streams.
//!
//! ## Example
//!
//! ```no_run
//! use std::io::Read;
//! use resfs::ResourceManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ResourceManager::new();
//! manager.add_root_folder("assets")?;
//! manager.add_archive("patch.zip")?;
//! manager.add_language_folder("lang/fr", "fr");
//! manager.set_language("fr");
//!
//! if let Some(data) = manager.read_data("intro.txt")? {
//!     println!("{} bytes", data.len());
//! }
//!
//! if let Some(mut stream) = manager.get_stream("music.ogg")? {
//!     let mut header = [0u8; 4];
//!     stream.read_exact(&mut header)?;
//! }
//! # Ok(())
//! # }
//! ```

use std::cell::{Cell, Ref, RefCell};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::archive::ArchiveFormat;
use crate::error::{ResourceError, ResourceResult};
use crate::index::{IndexEntry, ResourceIndex};
use crate::io::{Filesystem, FsEntry, OsFilesystem};
use crate::overlay::OverlayConfig;
use crate::path;
use crate::record::{RecordStore, ResourceRecord};
use crate::stream::{Backing, HandleId, StreamTable};
use crate::zip::ZipFormat;

/// Up-front buffer reservation for whole reads. Larger resources grow the
/// buffer as data actually arrives.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Unified view over root folders and archives.
///
/// Every operation takes `&self`, so configuration can change while streams
/// are open; the index is rebuilt on the next lookup. Open streams keep their
/// own record and reader and are unaffected by later configuration or
/// [`reset`](Self::reset). The manager is single threaded: it is `Send` but
/// not `Sync`.
pub struct ResourceManager {
    fs: Box<dyn Filesystem>,
    archive_format: Box<dyn ArchiveFormat>,
    root_folders: RefCell<Vec<PathBuf>>,
    archives: RefCell<Vec<PathBuf>>,
    records: RefCell<RecordStore>,
    overlay: RefCell<OverlayConfig>,
    index: RefCell<ResourceIndex>,
    dirty: Cell<bool>,
    streams: RefCell<StreamTable>,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceManager {
    /// Manager over the OS filesystem and ZIP archives.
    pub fn new() -> Self {
        Self::with_backends(OsFilesystem, ZipFormat)
    }

    /// Manager over custom filesystem and archive collaborators.
    pub fn with_backends(
        fs: impl Filesystem + 'static,
        archive_format: impl ArchiveFormat + 'static,
    ) -> Self {
        Self {
            fs: Box::new(fs),
            archive_format: Box::new(archive_format),
            root_folders: RefCell::new(Vec::new()),
            archives: RefCell::new(Vec::new()),
            records: RefCell::new(RecordStore::new()),
            overlay: RefCell::new(OverlayConfig::new()),
            index: RefCell::new(ResourceIndex::new()),
            dirty: Cell::new(true),
            streams: RefCell::new(StreamTable::new()),
        }
    }

    /// Register `root` and index every file below it.
    ///
    /// Hidden entries (leading `.`) are skipped. Files whose size cannot be
    /// read are still registered with an unknown size. Returns the number of
    /// records added.
    pub fn add_root_folder(&self, root: impl AsRef<Path>) -> ResourceResult<usize> {
        let root = root.as_ref().to_path_buf();
        self.root_folders.borrow_mut().push(root.clone());
        self.dirty.set(true);

        let entries = self
            .fs
            .list_entries(&root)
            .map_err(|source| ResourceError::RootFolder {
                path: root.clone(),
                source,
            })?;

        let mut discovered = Vec::new();
        self.walk(&root, "", entries, &mut discovered);
        let added = self.records.borrow_mut().extend(discovered);

        debug!(root = %root.display(), added, "root folder added");
        Ok(added)
    }

    fn walk(
        &self,
        dir: &Path,
        relative: &str,
        entries: Vec<FsEntry>,
        out: &mut Vec<ResourceRecord>,
    ) {
        for entry in entries {
            // Non-UTF-8 names only appear lossily in keys; the path keeps the real bytes
            let display_name = entry.name.to_string_lossy();
            if display_name.starts_with('.') {
                continue;
            }

            let child = dir.join(&entry.name);
            let child_relative = path::join(relative, &display_name);

            if entry.is_directory {
                match self.fs.list_entries(&child) {
                    Ok(children) => self.walk(&child, &child_relative, children, out),
                    Err(e) => {
                        warn!(dir = %child.display(), error = %e, "skipping unreadable directory")
                    }
                }
                continue;
            }

            let size = match self.fs.stat(&child) {
                Ok(size) => Some(size),
                Err(e) => {
                    warn!(file = %child.display(), error = %e, "size unknown");
                    None
                }
            };
            out.push(ResourceRecord::loose(&child_relative, child, size));
        }
    }

    /// Index every entry of the archive at `archive_path`.
    pub fn add_archive(&self, archive_path: impl AsRef<Path>) -> ResourceResult<usize> {
        self.add_archive_with_root(archive_path, "")
    }

    /// Index the entries of `archive_path` below `root_folder`, stored with
    /// that prefix removed. An empty `root_folder` takes every entry.
    ///
    /// Any failure to open or enumerate the archive aborts the call with
    /// nothing added.
    pub fn add_archive_with_root(
        &self,
        archive_path: impl AsRef<Path>,
        root_folder: &str,
    ) -> ResourceResult<usize> {
        let archive_path = archive_path.as_ref().to_path_buf();
        let archive_err = |source| ResourceError::Archive {
            path: archive_path.clone(),
            source,
        };

        let archive = self.archive_format.open(&archive_path).map_err(archive_err)?;
        let entries = archive.entries().map_err(archive_err)?;
        drop(archive);

        let root = path::normalize_separators(root_folder)
            .trim_matches('/')
            .to_string();

        let records: Vec<_> = entries
            .into_iter()
            .filter(|entry| !entry.is_folder_marker())
            .filter_map(|entry| {
                let stored = path::normalize_separators(&entry.path);
                let relative = if root.is_empty() {
                    stored
                } else {
                    path::strip_root(&stored, &root)?.to_string()
                };
                Some(ResourceRecord::archived(
                    &entry.path,
                    &relative,
                    &archive_path,
                    entry.position,
                    entry.uncompressed_size,
                ))
            })
            .collect();

        let added = self.records.borrow_mut().extend(records);
        self.archives.borrow_mut().push(archive_path.clone());
        self.dirty.set(true);

        debug!(archive = %archive_path.display(), root = %root, added, "archive added");
        Ok(added)
    }

    fn configure<T>(&self, change: impl FnOnce(&mut OverlayConfig) -> T) -> T {
        let result = change(&mut self.overlay.borrow_mut());
        self.dirty.set(true);
        result
    }

    /// Tag resources under `folder` with `language`.
    pub fn add_language_folder(&self, folder: &str, language: &str) {
        self.configure(|overlay| overlay.add_language_folder(folder, language));
    }

    pub fn remove_language_folder(&self, folder: &str) -> bool {
        self.configure(|overlay| overlay.remove_language_folder(folder))
    }

    /// Select the active language; an empty string selects none.
    pub fn set_language(&self, language: &str) {
        self.configure(|overlay| overlay.set_language(language));
    }

    /// Tag resources under `folder` with `category`.
    pub fn add_category_folder(&self, folder: &str, category: &str) {
        self.configure(|overlay| overlay.add_category_folder(folder, category));
    }

    pub fn remove_category_folder(&self, folder: &str) -> bool {
        self.configure(|overlay| overlay.remove_category_folder(folder))
    }

    pub fn enable_category(&self, category: &str) {
        self.configure(|overlay| overlay.enable_category(category));
    }

    pub fn disable_category(&self, category: &str) {
        self.configure(|overlay| overlay.disable_category(category));
    }

    /// Key resources by full relative path instead of basename.
    pub fn set_search_by_relative_paths(&self, enabled: bool) {
        self.configure(|overlay| overlay.set_search_by_relative_paths(enabled));
    }

    /// Also expose resources below `root` by their path relative to it.
    pub fn add_search_root(&self, root: &str) {
        self.configure(|overlay| overlay.add_search_root(root));
    }

    /// Forget every root, archive, record and overlay setting.
    ///
    /// Streams that are already open keep working until closed.
    pub fn reset(&self) {
        self.root_folders.borrow_mut().clear();
        self.archives.borrow_mut().clear();
        self.records.borrow_mut().clear();
        *self.overlay.borrow_mut() = OverlayConfig::new();
        *self.index.borrow_mut() = ResourceIndex::new();
        self.dirty.set(true);
        debug!("resource manager reset");
    }

    /// Snapshot of the current overlay settings.
    pub fn overlay(&self) -> OverlayConfig {
        self.overlay.borrow().clone()
    }

    pub fn root_folders(&self) -> Vec<PathBuf> {
        self.root_folders.borrow().clone()
    }

    pub fn archives(&self) -> Vec<PathBuf> {
        self.archives.borrow().clone()
    }

    pub fn record_count(&self) -> usize {
        self.records.borrow().len()
    }

    /// Rebuild the index now instead of on the next lookup.
    pub fn rebuild_index(&self) {
        let records = self.records.borrow();
        let index = ResourceIndex::build(records.iter(), &self.overlay.borrow());
        debug!(
            records = records.len(),
            keys = index.len(),
            "resource index rebuilt"
        );
        *self.index.borrow_mut() = index;
        self.dirty.set(false);
    }

    fn fresh_index(&self) -> Ref<'_, ResourceIndex> {
        if self.dirty.get() {
            self.rebuild_index();
        }
        self.index.borrow()
    }

    fn make_key(&self, name: &str) -> String {
        self.overlay.borrow().make_key(name)
    }

    /// Every live lookup key, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.fresh_index().keys().map(str::to_string).collect();
        keys.sort();
        keys
    }

    /// Resolve `name` to the record that currently wins its key.
    pub fn find_record(&self, name: &str) -> Option<Arc<ResourceRecord>> {
        self.describe(name).map(|entry| Arc::clone(entry.record()))
    }

    /// Resolve `name`, including the language/category tags of the winner.
    pub fn describe(&self, name: &str) -> Option<IndexEntry> {
        let key = self.make_key(name);
        self.fresh_index().get(&key).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        let key = self.make_key(name);
        self.fresh_index().contains_key(&key)
    }

    /// Declared size of `name`; `None` if it is missing or its size unknown.
    pub fn get_size(&self, name: &str) -> Option<u64> {
        self.find_record(name)?.size()
    }

    /// Read up to `buf.len()` bytes from the start of `name`.
    ///
    /// Returns 0 when the resource is missing or its storage cannot be
    /// opened. Errors after a successful open are returned.
    pub fn read_data_into(&self, name: &str, buf: &mut [u8]) -> ResourceResult<usize> {
        let Some(record) = self.find_record(name) else {
            return Ok(0);
        };

        let mut backing = match Backing::open(&record, &*self.fs, &*self.archive_format) {
            Ok(backing) => backing,
            Err(e) => {
                warn!(resource = name, error = %e, "failed to open resource");
                return Ok(0);
            }
        };

        backing.read_fully(&record, buf)
    }

    /// Read the whole of `name`.
    ///
    /// The size declared at discovery is binding: reading fewer or more
    /// bytes is a [`ResourceError::ShortRead`].
    pub fn read_data(&self, name: &str) -> ResourceResult<Option<Vec<u8>>> {
        let Some(record) = self.find_record(name) else {
            return Ok(None);
        };

        let mut backing = Backing::open(&record, &*self.fs, &*self.archive_format)?;

        let Some(expected) = record.size() else {
            let mut data = Vec::new();
            backing.read_to_end(&record, &mut data)?;
            return Ok(Some(data));
        };

        // Archive listings are untrusted; only a bounded reservation is made
        let capacity = usize::try_from(expected.min(MAX_PREALLOCATION)).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        let actual = backing.read_to_end(&record, &mut data)? as u64;
        if actual != expected {
            return Err(ResourceError::ShortRead {
                name: name.to_string(),
                expected,
                actual,
            });
        }

        Ok(Some(data))
    }

    /// Open an independent stream over `name`.
    ///
    /// Returns `Ok(None)` if the resource does not exist. The stream closes
    /// itself when dropped.
    pub fn get_stream(&self, name: &str) -> ResourceResult<Option<ResourceStream<'_>>> {
        let Some(record) = self.find_record(name) else {
            return Ok(None);
        };

        let handle = self.streams.borrow_mut().open(
            Arc::clone(&record),
            &*self.fs,
            &*self.archive_format,
        )?;

        Ok(Some(ResourceStream {
            manager: self,
            handle,
            record,
        }))
    }

    /// Read from an open stream; 0 for a closed or unknown handle.
    pub fn read(&self, handle: HandleId, buf: &mut [u8]) -> ResourceResult<usize> {
        self.streams.borrow_mut().read(handle, buf)
    }

    /// Reposition a loose-file stream; archived streams fail with
    /// [`ResourceError::Unsupported`].
    pub fn seek(&self, handle: HandleId, pos: SeekFrom) -> ResourceResult<u64> {
        self.streams.borrow_mut().seek(handle, pos)
    }

    /// Current position of a loose-file stream.
    pub fn tell(&self, handle: HandleId) -> ResourceResult<u64> {
        self.streams.borrow_mut().tell(handle)
    }

    /// Close a stream. Closing twice, or closing an unknown handle, is a
    /// no-op; returns whether anything was closed.
    pub fn close(&self, handle: HandleId) -> bool {
        self.streams.borrow_mut().close(handle)
    }

    /// Number of streams currently open.
    pub fn open_streams(&self) -> usize {
        self.streams.borrow().len()
    }
}

/// Scoped stream over one resource; closes its handle when dropped.
pub struct ResourceStream<'a> {
    manager: &'a ResourceManager,
    handle: HandleId,
    record: Arc<ResourceRecord>,
}

impl ResourceStream<'_> {
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn record(&self) -> &Arc<ResourceRecord> {
        &self.record
    }

    /// Current position; fails for archived resources.
    pub fn tell(&self) -> ResourceResult<u64> {
        self.manager.tell(self.handle)
    }

    /// Close explicitly. Dropping has the same effect.
    pub fn close(self) {}
}

impl Read for ResourceStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.manager.read(self.handle, buf)?)
    }
}

impl Seek for ResourceStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.manager.seek(self.handle, pos)?)
    }
}

impl Drop for ResourceStream<'_> {
    fn drop(&mut self) {
        self.manager.close(self.handle);
    }
}
