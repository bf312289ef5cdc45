//! Resource records and the append-only store that holds them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::EntryPosition;
use crate::path;

/// Physical storage behind a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Loose,
    Archived,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Loose => write!(f, "loose"),
            RecordKind::Archived => write!(f, "archived"),
        }
    }
}

/// Where a record's bytes live.
#[derive(Debug, Clone)]
pub enum ResourceLocation {
    /// A standalone file.
    Loose { file_path: PathBuf },
    /// An entry inside an archive, found again through its position token.
    Archived {
        archive_path: PathBuf,
        entry_path: String,
        position: EntryPosition,
    },
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLocation::Loose { file_path } => write!(f, "{}", file_path.display()),
            ResourceLocation::Archived {
                archive_path,
                entry_path,
                ..
            } => write!(f, "{}!{}", archive_path.display(), entry_path),
        }
    }
}

/// One physical resource instance, immutable once discovered.
#[derive(Debug)]
pub struct ResourceRecord {
    filename: String,
    relative_path: String,
    size: Option<u64>,
    location: ResourceLocation,
}

impl ResourceRecord {
    /// A loose file found under a root folder.
    pub fn loose(relative_path: &str, file_path: PathBuf, size: Option<u64>) -> Self {
        let relative_path = path::normalize_separators(relative_path);
        Self {
            filename: path::basename(&relative_path).to_string(),
            relative_path,
            size,
            location: ResourceLocation::Loose { file_path },
        }
    }

    /// An archive entry; `entry_path` is the full stored name, `relative_path`
    /// the name below the archive's root folder.
    pub fn archived(
        entry_path: &str,
        relative_path: &str,
        archive_path: &Path,
        position: EntryPosition,
        size: u64,
    ) -> Self {
        Self {
            filename: entry_path.to_string(),
            relative_path: path::normalize_separators(relative_path),
            size: Some(size),
            location: ResourceLocation::Archived {
                archive_path: archive_path.to_path_buf(),
                entry_path: entry_path.to_string(),
                position,
            },
        }
    }

    /// Name as found at discovery time, case preserved.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Path below the root folder or archive root, `/` separated.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Size known at discovery time; `None` if it could not be determined.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn location(&self) -> &ResourceLocation {
        &self.location
    }

    pub fn kind(&self) -> RecordKind {
        match self.location {
            ResourceLocation::Loose { .. } => RecordKind::Loose,
            ResourceLocation::Archived { .. } => RecordKind::Archived,
        }
    }
}

/// Append-only list of discovered records.
///
/// Records are shared out as `Arc`s so the index and open streams refer to
/// the same instance rather than copies.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Arc<ResourceRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn push(&mut self, record: ResourceRecord) -> Arc<ResourceRecord> {
        let record = Arc::new(record);
        self.records.push(Arc::clone(&record));
        record
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ResourceRecord>) -> usize {
        let before = self.records.len();
        self.records.extend(records.into_iter().map(Arc::new));
        self.records.len() - before
    }

    /// Records in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceRecord>> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
