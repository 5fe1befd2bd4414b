//! Error types for reading and rewriting image metadata.
//!
//! Codec and mutator failures are per image: the batch driver logs them with
//! the offending path and moves on. Only [`ExifError::ConfigLoad`] is fatal
//! for a whole edit run.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, ExifError>;

/// Everything that can go wrong while decoding, editing, or writing metadata.
#[derive(Error, Debug)]
pub enum ExifError {
    /// The file is not a JPEG, TIFF, or WebP image.
    #[error("unsupported container format")]
    UnsupportedContainer,

    /// The container is valid but carries no EXIF block.
    #[error("no embedded EXIF metadata")]
    MissingMetadata,

    /// The EXIF block is present but structurally inconsistent.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// A value or directory cannot be represented by the format's size fields.
    #[error("value too large: {0}")]
    ValueTooLarge(String),

    /// The container's metadata segment could not be replaced.
    #[error("cannot splice metadata: {0}")]
    Splice(String),

    /// A field name is not in the tag dictionary.
    #[error("unknown tag `{0}`")]
    UnknownTag(String),

    /// A configured value cannot be converted to the tag's type.
    #[error("cannot convert value for `{name}`: {reason}")]
    CoercionFailed { name: String, reason: String },

    /// The edit file could not be read or parsed.
    #[error("failed to load edit file {path}: {message}")]
    ConfigLoad { path: PathBuf, message: String },

    /// Filesystem failure on a single image.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker task died before producing a result.
    #[error("worker failed: {0}")]
    Worker(String),
}

impl ExifError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMetadata(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
