//! Error types for resource operations.
//!
//! A missing resource is not an error: lookups report it as `false`, `None`
//! or zero bytes. These variants cover failures once a resource was found.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;

/// Result type for resource manager operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors that can occur while discovering or reading resources.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A root folder could not be listed.
    #[error("failed to read root folder {}: {source}", path.display())]
    RootFolder { path: PathBuf, source: io::Error },

    /// A loose file could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    /// An archive could not be opened, enumerated, positioned or decoded.
    #[error("archive {}: {source}", path.display())]
    Archive { path: PathBuf, source: ArchiveError },

    /// Whole-resource read disagreed with the size declared at discovery.
    #[error("size mismatch reading '{name}': declared {expected} bytes, read {actual}")]
    ShortRead {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// Random access on a forward-only archived stream.
    #[error("{operation} is not supported on archived resource '{name}'")]
    Unsupported {
        operation: &'static str,
        name: String,
    },

    /// Reading an already open loose file failed.
    #[error("failed to read '{name}': {source}")]
    Io { name: String, source: io::Error },
}

impl From<ResourceError> for io::Error {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Io { source, .. } | ResourceError::Open { source, .. } => source,
            ResourceError::Unsupported { .. } => io::Error::new(io::ErrorKind::Unsupported, err),
            ResourceError::ShortRead { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_maps_to_io_kind() {
        let err = ResourceError::Unsupported {
            operation: "seek",
            name: "music.ogg".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "seek is not supported on archived resource 'music.ogg'"
        );
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_archive_error_display_includes_path() {
        let err = ResourceError::Archive {
            path: PathBuf::from("base.zip"),
            source: ArchiveError::Malformed("not a ZIP file"),
        };
        assert_eq!(
            err.to_string(),
            "archive base.zip: malformed archive: not a ZIP file"
        );
    }
}
