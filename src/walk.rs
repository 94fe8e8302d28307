use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::args::Verbosity;

/// Yields the regular files named by the command line, expanding directories
/// when walking is enabled.
///
/// Arguments are handled in order. A directory is walked depth-first with
/// entries sorted by file name, so the sequence is the same on every run.
/// The worklist is the pending argument queue plus the active walker; nothing
/// here recurses. A file reachable from more than one argument is yielded
/// only the first time.
pub struct FileSet {
    pending: VecDeque<PathBuf>,
    walker: Option<walkdir::IntoIter>,
    walk: bool,
    verbosity: Verbosity,
    skipped_directories: usize,
    seen: HashSet<PathBuf>,
}

impl FileSet {
    pub fn new<I>(paths: I, walk: bool, verbosity: Verbosity) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        FileSet {
            pending: paths.into_iter().collect(),
            walker: None,
            walk,
            verbosity,
            skipped_directories: 0,
            seen: HashSet::new(),
        }
    }

    /// Directory arguments passed over because walking was off.
    pub fn skipped_directories(&self) -> usize {
        self.skipped_directories
    }

    fn start_directory(&mut self, dir: &Path) {
        if self.walk {
            self.verbosity.say(format!("Processing directory {}", dir.display()));
            self.walker = Some(
                WalkDir::new(dir)
                    .min_depth(1)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter(),
            );
        } else {
            self.verbosity.say(format!("Skipping directory {}", dir.display()));
            self.skipped_directories += 1;
        }
    }

    /// Paths are compared in canonical form so `dir/a.jpg` and `dir/./a.jpg`
    /// count as the same file.
    fn first_visit(&mut self, path: &Path) -> bool {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.seen.insert(key)
    }

    fn next_walked(&mut self) -> Option<PathBuf> {
        let walker = self.walker.as_mut()?;

        for entry_result in walker.by_ref() {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    match err.path() {
                        Some(path) => warn!("Failed to access {}: {}", path.display(), err),
                        None => warn!("WalkDir error: {}", err),
                    }
                    continue;
                }
            };

            let path = entry.path();

            if entry.file_type().is_dir() {
                self.verbosity.say(format!("Processing directory {}", path.display()));
                continue;
            }

            if !path.is_file() {
                continue;
            }

            return Some(path.to_path_buf());
        }

        self.walker = None;
        None
    }
}

impl Iterator for FileSet {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let path = match self.next_walked() {
                Some(path) => path,
                None => {
                    let path = self.pending.pop_front()?;
                    if path.is_dir() {
                        self.start_directory(&path);
                        continue;
                    }
                    path
                }
            };

            if self.first_visit(&path) {
                return Some(path);
            }
            self.verbosity.say(format!("Skipping duplicate {}", path.display()));
        }
    }
}
