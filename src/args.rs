use clap::{ArgAction, CommandFactory, Parser};
use std::path::PathBuf;

/// Read metadata from image files with exiftool and write it to extended
/// attributes so desktop search can find files by their embedded metadata.
/// Requires exiftool: https://exiftool.org/
#[derive(Debug, Parser)]
#[command(
    name = "exif2xattr",
    version,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Args {
    /// Show this message and exit.
    #[arg(short = 'h', long = "help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Show the version and exit.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Show verbose output
    #[arg(short = 'V', long = "verbose")]
    pub verbose: bool,

    /// Optionally specify path to exiftool; if not provided, will search for
    /// exiftool in $PATH.
    #[arg(long = "exiftool", value_name = "PATH", value_parser = existing_path)]
    pub exiftool: Option<PathBuf>,

    /// Recursively walk directories and process any files found
    #[arg(short = 'w', long = "walk")]
    pub walk: bool,

    /// Files and/or directories to process
    #[arg(value_name = "FILE", value_parser = existing_path)]
    pub files: Vec<PathBuf>,
}

/// How much per-file narration the run prints. Passed explicitly to the
/// traversal and the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn is_verbose(self) -> bool {
        self == Verbosity::Verbose
    }

    /// Print `message` to stdout only in verbose mode.
    pub fn say(self, message: impl std::fmt::Display) {
        if self.is_verbose() {
            println!("{}", message);
        }
    }
}

impl Args {
    pub fn verbosity(&self) -> Verbosity {
        if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Rendered help text, shown for `--help` and when no files are given.
    pub fn help_text() -> String {
        Args::command().render_help().to_string()
    }
}

/// Reject paths that don't exist while parsing, before any processing.
fn existing_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("path '{}' does not exist", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;

    #[test]
    fn test_help_text_shows_usage() {
        let help = Args::help_text();
        assert!(help.contains("Usage:"));
        assert!(help.contains("[OPTIONS] [FILE]..."));
        assert!(help.contains("--exiftool <PATH>"));
        assert!(help.contains("--walk"));
    }

    #[test]
    fn test_parse_flags_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("photo.jpg");
        fs::write(&file, b"not really a jpeg").unwrap();

        let args = Args::try_parse_from([
            OsStr::new("exif2xattr"),
            OsStr::new("-V"),
            OsStr::new("-w"),
            file.as_os_str(),
            dir.path().as_os_str(),
        ])
        .unwrap();

        assert!(args.verbose);
        assert!(args.walk);
        assert_eq!(args.verbosity(), Verbosity::Verbose);
        assert_eq!(args.exiftool, None);
        assert_eq!(args.files, vec![file, dir.path().to_path_buf()]);
    }

    #[test]
    fn test_no_files_is_accepted() {
        let args = Args::try_parse_from(["exif2xattr"]).unwrap();
        assert!(args.files.is_empty());
        assert_eq!(args.verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_missing_path_rejected_at_parse_time() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.jpg");

        let err = Args::try_parse_from([OsStr::new("exif2xattr"), missing.as_os_str()]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_missing_exiftool_rejected_at_parse_time() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("myexiftool");

        let result = Args::try_parse_from([
            OsStr::new("exif2xattr"),
            OsStr::new("--exiftool"),
            missing.as_os_str(),
            dir.path().as_os_str(),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_help_flag_short_circuits() {
        let err = Args::try_parse_from(["exif2xattr", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
