use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::args::Verbosity;
use crate::attributes::{default_mappings, resolve_attributes, AttributeMapping, AttributeWriter};
use crate::error::Exif2XattrError;
use crate::metadata::MetadataExtractor;
use crate::walk::FileSet;

const PROGRESS_EVERY: usize = 100;

/// Runs the per-file pipeline (extract, normalize, map, write) over the
/// files named on the command line.
pub struct Processor<E, W> {
    extractor: E,
    writer: W,
    verbosity: Verbosity,
    mappings: Vec<AttributeMapping>,
    stats: ProcessingStats,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total_files: usize,
    pub processed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub attributes_written: usize,
    pub skipped_directories: usize,
}

impl<E, W> Processor<E, W>
where
    E: MetadataExtractor,
    W: AttributeWriter,
{
    pub fn new(extractor: E, writer: W, verbosity: Verbosity) -> Self {
        Processor {
            extractor,
            writer,
            verbosity,
            mappings: default_mappings(),
            stats: ProcessingStats::default(),
        }
    }

    /// Replace the platform's default attribute tables.
    pub fn with_mappings(mut self, mappings: &[AttributeMapping]) -> Self {
        self.mappings = mappings.to_vec();
        self
    }

    /// Process every file reachable from `paths`. A file that fails is
    /// reported and counted; it never stops the run.
    pub fn process_paths(&mut self, paths: &[PathBuf], walk: bool) -> &ProcessingStats {
        println!("Processing {} files", paths.len());

        let mut files = FileSet::new(paths.iter().cloned(), walk, self.verbosity);

        for file in files.by_ref() {
            self.stats.total_files += 1;
            self.verbosity.say(format!("Processing file {}", file.display()));

            match self.process_file(&file) {
                Ok(written) => {
                    self.stats.processed += 1;
                    self.stats.attributes_written += written;
                }
                Err(e) => {
                    self.stats.failed += 1;
                    eprintln!("Failed to process {}: {:#}", file.display(), anyhow::Error::new(e));
                }
            }

            if !self.verbosity.is_verbose() && self.stats.total_files % PROGRESS_EVERY == 0 {
                println!("Progress: {} files processed", self.stats.total_files);
            }
        }

        self.stats.skipped_directories = files.skipped_directories();
        self.print_summary();
        &self.stats
    }

    /// Extract, normalize and write attributes for a single file. Returns the
    /// number of attributes written.
    pub fn process_file(&mut self, file_path: &Path) -> Result<usize, Exif2XattrError> {
        let mut record = self.extractor.extract(file_path)?;

        if let Some(warning) = record.warning() {
            self.stats.warnings += 1;
            eprintln!("Warning: exiftool reported for {}: {}", file_path.display(), warning);
        }

        record.normalize();
        trace!(
            file = %file_path.display(),
            record = %serde_json::to_string(&record).unwrap_or_default(),
            "normalized metadata"
        );

        let assignments = resolve_attributes(&record, &self.mappings);
        if assignments.is_empty() {
            debug!(file = %file_path.display(), "no mapped tags found");
        }

        for assignment in &assignments {
            self.writer.write(file_path, assignment)?;
            self.verbosity
                .say(format!("  {} = {}", assignment.name, assignment.text()));
        }

        Ok(assignments.len())
    }

    fn print_summary(&self) {
        let stats = &self.stats;

        println!();
        println!("=== PROCESSING COMPLETE ===");
        println!("Total files: {}", stats.total_files);
        println!("Successfully processed: {}", stats.processed);
        println!("Attributes written: {}", stats.attributes_written);
        if stats.warnings > 0 {
            println!("Files with exiftool warnings: {}", stats.warnings);
        }
        if stats.skipped_directories > 0 {
            println!(
                "Skipped directories: {} (use --walk to process them)",
                stats.skipped_directories
            );
        }
        println!("Failed: {}", stats.failed);
    }
}
