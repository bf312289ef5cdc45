use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "resfs")]
#[command(version)]
#[command(about = "Query a virtual resource filesystem built from folders and ZIP archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  resfs -r res --language-folder res/fr=fr -L fr cat hello.txt\n  \
  resfs -a base.zip=data -R keys 'textures/*'\n  \
  resfs -r assets -a patch.zip extract -d out logo.png intro.ogg")]
pub struct Cli {
    /// Root folder to index (repeatable)
    #[arg(short = 'r', long = "root", value_name = "DIR")]
    pub roots: Vec<String>,

    /// ZIP archive to index, optionally limited to a folder inside it (repeatable).
    /// ROOT is only split off when the part before the last `=` ends in `.zip`
    #[arg(short = 'a', long = "archive", value_name = "ZIP[=ROOT]")]
    pub archives: Vec<String>,

    /// Active language
    #[arg(short = 'L', long, value_name = "LANG")]
    pub language: Option<String>,

    /// Map a folder to a language (repeatable)
    #[arg(long = "language-folder", value_name = "FOLDER=LANG", value_parser = parse_mapping)]
    pub language_folders: Vec<(String, String)>,

    /// Map a folder to a category (repeatable)
    #[arg(long = "category-folder", value_name = "FOLDER=CATEGORY", value_parser = parse_mapping)]
    pub category_folders: Vec<(String, String)>,

    /// Enable a category (repeatable)
    #[arg(short = 'c', long = "category", value_name = "CATEGORY")]
    pub categories: Vec<String>,

    /// Look resources up by relative path instead of file name
    #[arg(short = 'R', long)]
    pub relative_paths: bool,

    /// Also expose resources relative to this prefix (repeatable)
    #[arg(short = 's', long = "search-root", value_name = "PREFIX")]
    pub search_roots: Vec<String>,

    /// More log output (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report whether each resource resolves
    Exists {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },

    /// Print the declared size of each resource
    Size {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },

    /// Stream resources to stdout
    Cat {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },

    /// Write resources to disk
    Extract {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        /// Extract files into exdir
        #[arg(short = 'd', value_name = "DIR")]
        extract_dir: Option<String>,

        /// Never overwrite existing files
        #[arg(short = 'n')]
        never_overwrite: bool,

        /// Overwrite files WITHOUT prompting
        #[arg(short = 'o')]
        overwrite: bool,

        /// Junk paths (do not make directories)
        #[arg(short = 'j')]
        junk_paths: bool,
    },

    /// List lookup keys, optionally filtered by a `*`/`?` pattern
    Keys {
        #[arg(value_name = "PATTERN")]
        pattern: Option<String>,
    },
}

impl Cli {
    /// Split each `--archive` value into the archive path and its root folder.
    pub fn archive_specs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.archives.iter().map(|spec| split_archive_spec(spec))
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (q, _) if q > 1 => "off",
            (1, _) => "error",
            (_, 0) => "warn",
            (_, 1) => "debug",
            _ => "trace",
        }
    }
}

/// `game.zip=data` names a root folder; `a=b.zip` is just a file name.
fn split_archive_spec(spec: &str) -> (&str, &str) {
    match spec.rsplit_once('=') {
        Some((archive, root)) if archive.to_ascii_lowercase().ends_with(".zip") => (archive, root),
        _ => (spec, ""),
    }
}

fn parse_mapping(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((folder, tag)) if !folder.is_empty() && !tag.is_empty() => {
            Ok((folder.to_string(), tag.to_string()))
        }
        _ => Err(format!("expected FOLDER=VALUE, got '{value}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "resfs",
            "-r",
            "res",
            "-a",
            "base.zip=data",
            "-a",
            "patch.zip",
            "--language-folder",
            "res/fr=fr",
            "-L",
            "fr",
            "--category-folder",
            "hd=hd",
            "-c",
            "hd",
            "-R",
            "-s",
            "assets",
            "cat",
            "hello.txt",
        ])
        .unwrap();

        assert_eq!(cli.roots, vec!["res"]);
        assert_eq!(
            cli.archive_specs().collect::<Vec<_>>(),
            vec![("base.zip", "data"), ("patch.zip", "")]
        );
        assert_eq!(cli.language_folders, vec![("res/fr".to_string(), "fr".to_string())]);
        assert_eq!(cli.language.as_deref(), Some("fr"));
        assert!(cli.relative_paths);
        assert!(matches!(cli.command, Command::Cat { ref names } if names == &["hello.txt"]));
    }

    #[test]
    fn test_archive_spec_with_equals_in_name() {
        assert_eq!(split_archive_spec("a=b.zip"), ("a=b.zip", ""));
        assert_eq!(split_archive_spec("x=y.zip=data"), ("x=y.zip", "data"));
        assert_eq!(split_archive_spec("Base.ZIP=assets/hd"), ("Base.ZIP", "assets/hd"));
        assert_eq!(split_archive_spec("plain.zip"), ("plain.zip", ""));
    }

    #[test]
    fn test_bad_mapping_rejected() {
        let result = Cli::try_parse_from(["resfs", "--language-folder", "nofolder", "keys"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::try_parse_from(["resfs", "-vv", "keys"]).unwrap();
        assert_eq!(cli.log_level(), "trace");
        let cli = Cli::try_parse_from(["resfs", "-qq", "keys"]).unwrap();
        assert_eq!(cli.log_level(), "off");
        let cli = Cli::try_parse_from(["resfs", "keys"]).unwrap();
        assert_eq!(cli.log_level(), "warn");
    }
}
