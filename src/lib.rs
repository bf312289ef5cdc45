//! # resfs
//!
//! A virtual resource filesystem for game and application assets.
//!
//! Assets can be spread over several directory trees and ZIP archives. The
//! [`ResourceManager`] indexes all of them into one namespace and resolves
//! each logical name to a single physical source, honouring language and
//! category overlay folders.
//!
//! ## Features
//!
//! - Loose files from any number of root folders
//! - ZIP archives (STORED and DEFLATE, ZIP64), optionally scoped to a subfolder
//! - Language overlays: `lang/fr/intro.txt` shadows `lang/en/intro.txt` when
//!   the active language is `fr`
//! - Category overlays that hide whole folders until enabled
//! - Lookup by basename or by relative path, with search-root shorthands
//! - Any number of concurrently open streams, closed automatically on drop
//!
//! ## Example
//!
//! ```no_run
//! use resfs::ResourceManager;
//!
//! fn main() -> resfs::ResourceResult<()> {
//!     let manager = ResourceManager::new();
//!     manager.add_root_folder("res")?;
//!     manager.add_language_folder("res/en", "en");
//!     manager.add_language_folder("res/fr", "fr");
//!     manager.set_language("fr");
//!
//!     let hello = manager.read_data("hello.txt")?.unwrap_or_default();
//!     println!("{}", String::from_utf8_lossy(&hello));
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod error;
pub mod index;
pub mod io;
pub mod manager;
pub mod overlay;
pub mod path;
pub mod record;
pub mod stream;
pub mod zip;

pub use archive::{Archive, ArchiveEntry, ArchiveError, ArchiveFormat, EntryPosition};
pub use cli::Cli;
pub use error::{ResourceError, ResourceResult};
pub use index::{IndexEntry, ResourceIndex};
pub use io::{Filesystem, FsEntry, LocalFileReader, OsFilesystem, ReadAt};
pub use manager::{ResourceManager, ResourceStream};
pub use overlay::OverlayConfig;
pub use record::{RecordKind, ResourceLocation, ResourceRecord};
pub use stream::HandleId;
pub use zip::{ZipArchive, ZipFormat};
