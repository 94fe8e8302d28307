use clap::Parser;
use tracing_subscriber::EnvFilter;

use exif2xattr::args::{Args, Verbosity};
use exif2xattr::attributes::XattrWriter;
use exif2xattr::metadata::{find_exiftool, ExifToolExtractor};
use exif2xattr::processor::Processor;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns false when at least one file failed.
fn run() -> anyhow::Result<bool> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    if args.files.is_empty() {
        print!("{}", Args::help_text());
        return Ok(true);
    }

    let exiftool_path = find_exiftool(args.exiftool.as_deref())?;
    verbosity.say(format!("exiftool path: {}", exiftool_path.display()));

    let extractor = ExifToolExtractor::new(&exiftool_path)?;
    let mut processor = Processor::new(extractor, XattrWriter, verbosity);
    let stats = processor.process_paths(&args.files, args.walk);

    Ok(stats.failed == 0)
}

/// RUST_LOG wins; otherwise --verbose turns on debug events for this crate.
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbosity.is_verbose() {
            "exif2xattr=debug"
        } else {
            "exif2xattr=warn"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
