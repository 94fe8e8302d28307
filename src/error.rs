use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors the tool classifies. Startup errors abort the run; the per-file
/// ones are reported and the run moves on to the next file.
#[derive(Debug, Error)]
pub enum Exif2XattrError {
    #[error("exiftool not found: {path} does not exist")]
    ExifToolMissing { path: PathBuf },

    #[error("could not find exiftool in $PATH, use --exiftool to specify its location")]
    ExifToolNotFound(#[source] which::Error),

    #[error("failed to start exiftool at {path}: {message}")]
    ExifToolStart { path: PathBuf, message: String },

    #[error("failed to extract metadata from {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("failed to write attribute {name} on {path}")]
    AttributeWrite {
        path: PathBuf,
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode attribute {name}")]
    AttributeEncode {
        name: String,
        #[source]
        source: plist::Error,
    },
}

impl Exif2XattrError {
    pub fn extraction(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Exif2XattrError::Extraction {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
