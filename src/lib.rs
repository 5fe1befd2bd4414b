//! # bulk-exif
//!
//! Bulk EXIF metadata reader and editor: print the metadata of every JPEG,
//! TIFF, and WebP image under a directory, or apply one set of field edits
//! from a YAML file to all of them.
//!
//! ## Quick Start
//!
//! The pipeline module handles the full decode → edit → write flow:
//!
//! ```rust,no_run
//! use bulk_exif::config::EditSet;
//! use bulk_exif::exif::TagDictionary;
//! use bulk_exif::pipeline::{EditOptions, collect_images, edit_image};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     // Field name → value, e.g. `exif: { Make: NewCo, Orientation: 1 }`
//!     let edits = EditSet::load(Path::new("edits.yaml"))?;
//!     let dict = TagDictionary::standard();
//!
//!     for path in collect_images(Path::new("./photos")) {
//!         match edit_image(&path, &edits, &dict, EditOptions::default()) {
//!             Ok(report) => println!("{}: {} field(s) applied", path.display(), report.applied()),
//!             Err(e) => eprintln!("Error processing {}: {e}", path.display()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The codec can be driven directly on in-memory bytes:
//!
//! ```rust,no_run
//! use bulk_exif::exif::{self, TagDictionary, TagValue};
//!
//! fn main() -> anyhow::Result<()> {
//!     let original = std::fs::read("photo.jpg")?;
//!
//!     // 1. Decode the embedded block
//!     let mut block = exif::decode(&original)?;
//!     for line in exif::render(&block, &TagDictionary::standard()) {
//!         println!("{line}");
//!     }
//!
//!     // 2. Change a field
//!     block.primary.insert(0x010F, TagValue::ascii("NewCo"));
//!
//!     // 3. Re-encode, splice back into the container, and replace the file
//!     let tiff = exif::encode(&block)?;
//!     let updated = exif::write_back(&original, &tiff)?;
//!     exif::write_file("photo.jpg".as_ref(), &updated)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Write Strategy |
//! |--------|---------------|
//! | JPEG (`.jpg`, `.jpeg`) | APP1 `Exif` segment replaced in place |
//! | WebP (`.webp`) | RIFF `EXIF` chunk replaced |
//! | TIFF (`.tif`, `.tiff`) | New IFDs appended, header repointed |
//!
//! ## Modules
//!
//! - [`config`]: The edit file (`EditSet`) and its loading
//! - [`error`]: The library error type
//! - [`exif`]: TIFF/EXIF codec, containers, tag dictionary, mutator, and printer
//! - [`pipeline`]: Image collection, per-image read/edit, and the batch driver

pub mod config;
pub mod error;
pub mod exif;
pub mod pipeline;

pub use error::{ExifError, Result};
