//! Main entry point for the resfs CLI application.
//!
//! Builds a resource manager from the command-line configuration and runs a
//! single query against it.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use resfs::cli::{Cli, Command};
use resfs::ResourceManager;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);

    let manager = build_manager(&cli)?;

    match &cli.command {
        Command::Exists { names } => exists(&manager, names),
        Command::Size { names } => size(&manager, names),
        Command::Cat { names } => cat(&manager, names),
        Command::Extract {
            names,
            extract_dir,
            never_overwrite,
            overwrite,
            junk_paths,
        } => {
            let options = ExtractOptions {
                extract_dir: extract_dir.as_deref(),
                never_overwrite: *never_overwrite,
                overwrite: *overwrite,
                junk_paths: *junk_paths,
                quiet: cli.is_quiet(),
            };
            for name in names {
                extract_resource(&manager, name, &options)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Keys { pattern } => keys(&manager, pattern.as_deref()),
    }
}

/// Send logs to stderr so piped resource data stays clean.
///
/// `RUST_LOG` wins over the `-v`/`-q` flags.
fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Apply every source and overlay flag to a fresh manager.
fn build_manager(cli: &Cli) -> Result<ResourceManager> {
    let manager = ResourceManager::new();

    manager.set_search_by_relative_paths(cli.relative_paths);
    for root in &cli.search_roots {
        manager.add_search_root(root);
    }
    for (folder, language) in &cli.language_folders {
        manager.add_language_folder(folder, language);
    }
    if let Some(language) = &cli.language {
        manager.set_language(language);
    }
    for (folder, category) in &cli.category_folders {
        manager.add_category_folder(folder, category);
    }
    for category in &cli.categories {
        manager.enable_category(category);
    }

    for root in &cli.roots {
        manager
            .add_root_folder(root)
            .with_context(|| format!("cannot index root folder {root}"))?;
    }
    for (archive, root) in cli.archive_specs() {
        manager
            .add_archive_with_root(archive, root)
            .with_context(|| format!("cannot index archive {archive}"))?;
    }

    Ok(manager)
}

/// Print `yes`/`no` per name; fails the process if any is missing.
fn exists(manager: &ResourceManager, names: &[String]) -> Result<ExitCode> {
    let mut all_found = true;
    for name in names {
        let found = manager.exists(name);
        all_found &= found;
        println!("{}\t{}", if found { "yes" } else { "no" }, name);
    }
    Ok(if all_found {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn size(manager: &ResourceManager, names: &[String]) -> Result<ExitCode> {
    let mut all_found = true;
    for name in names {
        match manager.get_size(name) {
            Some(size) => println!("{:>10}  {}", size, name),
            None if manager.exists(name) => println!("{:>10}  {}", "?", name),
            None => {
                all_found = false;
                eprintln!("{}: not found", name);
            }
        }
    }
    Ok(if all_found {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Stream each resource to stdout through its own handle.
fn cat(manager: &ResourceManager, names: &[String]) -> Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for name in names {
        let Some(mut stream) = manager.get_stream(name)? else {
            bail!("{}: not found", name);
        };
        io::copy(&mut stream, &mut out).with_context(|| format!("failed to read {name}"))?;
    }

    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

/// List keys with the size and physical source of their winner.
fn keys(manager: &ResourceManager, pattern: Option<&str>) -> Result<ExitCode> {
    let pattern = pattern.map(str::to_lowercase);

    for key in manager.keys() {
        if let Some(pattern) = &pattern {
            if !glob_match(pattern, &key) {
                continue;
            }
        }

        let Some(entry) = manager.describe(&key) else {
            continue;
        };
        let record = entry.record();
        let size = record
            .size()
            .map(format_size)
            .unwrap_or_else(|| "?".to_string());
        let mut tags = Vec::new();
        if let Some(language) = entry.language() {
            tags.push(format!("lang={language}"));
        }
        if let Some(category) = entry.category() {
            tags.push(format!("category={category}"));
        }

        println!(
            "{:<40}  {:>12}  {:<8}  {}{}",
            key,
            size,
            record.kind().to_string(),
            record.location(),
            if tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", tags.join(", "))
            }
        );
    }

    Ok(ExitCode::SUCCESS)
}

struct ExtractOptions<'a> {
    extract_dir: Option<&'a str>,
    never_overwrite: bool,
    overwrite: bool,
    junk_paths: bool,
    quiet: bool,
}

/// Write one resource to disk.
///
/// The output name is the resource's relative path (or just its file name
/// with `-j`), below `-d DIR` when given.
fn extract_resource(manager: &ResourceManager, name: &str, options: &ExtractOptions) -> Result<()> {
    let Some(record) = manager.find_record(name) else {
        bail!("{}: not found", name);
    };

    let relative = record.relative_path();
    let file_name = if options.junk_paths {
        resfs::path::basename(relative).to_string()
    } else {
        relative.to_string()
    };
    let Some(safe_name) = sanitize_output_path(&file_name) else {
        bail!("{}: no usable output name in {}", name, relative);
    };
    if safe_name != Path::new(&file_name) {
        warn!(resource = name, from = %file_name, to = %safe_name.display(), "stripped unsafe path components");
    }
    let output_path = match options.extract_dir {
        Some(dir) => PathBuf::from(dir).join(&safe_name),
        None => safe_name,
    };

    if output_path.exists() {
        if options.never_overwrite {
            if !options.quiet {
                eprintln!("Skipping: {} (file exists)", name);
            }
            return Ok(());
        }

        if !options.overwrite {
            if !options.quiet {
                eprintln!("Skipping: {} (use -o to overwrite)", name);
            }
            return Ok(());
        }
    }

    if !options.quiet {
        println!("  extracting: {}", relative);
    }

    let data = manager
        .read_data(name)?
        .with_context(|| format!("{name} disappeared during extraction"))?;
    write_file(&output_path, &data)
}

/// Keep only the plain components of an entry path, dropping `..`, roots
/// and drive prefixes. `None` if nothing is left.
fn sanitize_output_path(relative: &str) -> Option<PathBuf> {
    let path: PathBuf = Path::new(relative)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    (!path.as_os_str().is_empty()).then_some(path)
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// ```ignore
/// assert!(glob_match("*.txt", "readme.txt"));
/// assert!(glob_match("file?.dat", "file1.dat"));
/// assert!(!glob_match("*.txt", "readme.md"));
/// ```
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            // zero characters, or one more
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resfs::archive::ArchiveResult;
    use resfs::{Archive, ArchiveEntry, ArchiveFormat, EntryPosition, OsFilesystem};

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.txt", "readme.txt"));
        assert!(glob_match("textures/*", "textures/demo.png"));
        assert!(glob_match("file?.dat", "file1.dat"));
        assert!(!glob_match("*.txt", "readme.md"));
        assert!(!glob_match("file?.dat", "file.dat"));
    }

    #[test]
    fn test_sanitize_output_path() {
        assert_eq!(
            sanitize_output_path("textures/demo.png"),
            Some(PathBuf::from("textures/demo.png"))
        );
        assert_eq!(
            sanitize_output_path("../../etc/passwd"),
            Some(PathBuf::from("etc/passwd"))
        );
        assert_eq!(
            sanitize_output_path("/abs/./x.txt"),
            Some(PathBuf::from("abs/x.txt"))
        );
        assert_eq!(sanitize_output_path("../.."), None);
        assert_eq!(sanitize_output_path(""), None);
    }

    /// Archive with a single entry whose name climbs two folders up.
    struct ClimbingArchive {
        done: bool,
    }

    impl Archive for ClimbingArchive {
        fn entries(&self) -> ArchiveResult<Vec<ArchiveEntry>> {
            Ok(vec![ArchiveEntry {
                path: "../../escape.txt".to_string(),
                uncompressed_size: 7,
                position: EntryPosition::from_raw(0),
            }])
        }

        fn seek_to(&mut self, _position: EntryPosition) -> ArchiveResult<()> {
            self.done = false;
            Ok(())
        }

        fn open_current_entry(&mut self) -> ArchiveResult<()> {
            Ok(())
        }

        fn read_current_entry(&mut self, buf: &mut [u8]) -> ArchiveResult<usize> {
            if self.done {
                return Ok(0);
            }
            self.done = true;
            buf[..7].copy_from_slice(b"payload");
            Ok(7)
        }

        fn close_current_entry(&mut self) {}
    }

    struct ClimbingFormat;

    impl ArchiveFormat for ClimbingFormat {
        fn open(&self, _path: &Path) -> ArchiveResult<Box<dyn Archive>> {
            Ok(Box::new(ClimbingArchive { done: false }))
        }
    }

    #[test]
    fn test_extract_stays_inside_target_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let manager = ResourceManager::with_backends(OsFilesystem, ClimbingFormat);
        manager.add_archive(temp.path().join("climb.zip")).unwrap();

        let out = temp.path().join("nested/out");
        let options = ExtractOptions {
            extract_dir: out.to_str(),
            never_overwrite: false,
            overwrite: true,
            junk_paths: false,
            quiet: true,
        };
        extract_resource(&manager, "escape.txt", &options).unwrap();

        assert_eq!(std::fs::read(out.join("escape.txt")).unwrap(), b"payload");
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 bytes");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }
}
