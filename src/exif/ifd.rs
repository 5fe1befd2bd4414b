use std::collections::BTreeMap;
use std::fmt;

use super::value::{Endian, TagValue};

/// Tag id → value. Iteration (and encoding) order is ascending tag id.
pub type Directory = BTreeMap<u16, TagValue>;

/// The image file directories an EXIF block can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IfdKind {
    /// `0th`: primary image.
    Primary,
    Exif,
    Gps,
    Interop,
    /// `1st`: thumbnail image.
    Thumbnail,
}

impl IfdKind {
    /// Every directory, in encode order.
    pub const ALL: [IfdKind; 5] = [
        IfdKind::Primary,
        IfdKind::Exif,
        IfdKind::Gps,
        IfdKind::Interop,
        IfdKind::Thumbnail,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IfdKind::Primary => "0th",
            IfdKind::Exif => "Exif",
            IfdKind::Gps => "GPS",
            IfdKind::Interop => "Interop",
            IfdKind::Thumbnail => "1st",
        }
    }
}

impl fmt::Display for IfdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fully decoded EXIF block.
///
/// Pointer tags (Exif/GPS/Interop IFD offsets, thumbnail offset and length)
/// never appear in the directories: the reader consumes them and the writer
/// synthesizes them from the layout it produces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataBlock {
    pub byte_order: Endian,
    pub primary: Directory,
    pub exif: Directory,
    pub gps: Directory,
    pub interop: Directory,
    pub thumbnail: Directory,
    /// Raw JPEG thumbnail referenced by the `1st` IFD, carried through untouched.
    pub thumbnail_data: Option<Vec<u8>>,
    /// Next-IFD offset stored in `1st`, i.e. the third page of a multi-page
    /// TIFF. It is relative to the source block, so only an in-place TIFF
    /// rewrite keeps it.
    pub next_ifd: Option<u32>,
}

impl MetadataBlock {
    pub fn new(byte_order: Endian) -> Self {
        Self {
            byte_order,
            ..Self::default()
        }
    }

    pub fn directory(&self, kind: IfdKind) -> &Directory {
        match kind {
            IfdKind::Primary => &self.primary,
            IfdKind::Exif => &self.exif,
            IfdKind::Gps => &self.gps,
            IfdKind::Interop => &self.interop,
            IfdKind::Thumbnail => &self.thumbnail,
        }
    }

    pub fn directory_mut(&mut self, kind: IfdKind) -> &mut Directory {
        match kind {
            IfdKind::Primary => &mut self.primary,
            IfdKind::Exif => &mut self.exif,
            IfdKind::Gps => &mut self.gps,
            IfdKind::Interop => &mut self.interop,
            IfdKind::Thumbnail => &mut self.thumbnail,
        }
    }

    /// Total number of entries across all directories.
    pub fn len(&self) -> usize {
        IfdKind::ALL.iter().map(|&k| self.directory(k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.thumbnail_data.is_none()
    }
}
