//! EXIF metadata decoding, editing, and writing.
//!
//! The pieces, bottom-up:
//!
//! - [`value`] / [`ifd`]: typed values, directories, and [`MetadataBlock`]
//! - [`reader`] / [`writer`]: TIFF-structure codec ([`parse_tiff`], [`encode`])
//! - [`container`]: locating and replacing the block inside JPEG, TIFF, and WebP files
//! - [`tags`]: the static name ↔ id dictionary
//! - [`mutator`]: applying an [`EditSet`](crate::config::EditSet) to a block
//! - [`printer`]: the human-readable (and JSON) report
//!
//! [`decode`] and [`write_back`] tie the codec to the containers.

pub mod container;
pub mod ifd;
pub mod mutator;
pub mod printer;
pub mod reader;
pub mod tags;
pub mod value;
pub mod writer;

pub use container::Container;
pub use ifd::{Directory, IfdKind, MetadataBlock};
pub use mutator::{EditOutcome, apply};
pub use printer::{render, render_json, render_report};
pub use reader::parse_tiff;
pub use tags::{TagDictionary, TagInfo};
pub use value::{Endian, Rational, SRational, TagType, TagValue};
pub use writer::{encode, write_file};

use crate::error::Result;

/// Decode the EXIF block embedded in a JPEG, TIFF, or WebP file.
pub fn decode(data: &[u8]) -> Result<MetadataBlock> {
    let tiff = container::extract_tiff(data)?;
    parse_tiff(&tiff)
}

/// Produce a new file image with its EXIF block replaced by `tiff`.
///
/// `tiff` is an encoded block as returned by [`encode`]. Everything outside
/// the metadata segment is carried over unchanged.
pub fn write_back(original: &[u8], tiff: &[u8]) -> Result<Vec<u8>> {
    container::splice(original, tiff)
}
