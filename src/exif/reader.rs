//! TIFF-structure decoder.
//!
//! Every offset and length read from the block is validated against the
//! buffer before it is dereferenced; inconsistencies surface as
//! [`ExifError::MalformedMetadata`] instead of panics.

use std::collections::HashSet;

use super::ifd::{Directory, IfdKind, MetadataBlock};
use super::tags::{
    TAG_EXIF_IFD_POINTER, TAG_GPS_IFD_POINTER, TAG_INTEROP_IFD_POINTER,
    TAG_JPEG_INTERCHANGE_FORMAT, TAG_JPEG_INTERCHANGE_FORMAT_LENGTH,
};
use super::value::{Endian, TagType, TagValue};
use crate::error::{ExifError, Result};

const ENTRY_SIZE: usize = 12;

/// Parse a raw TIFF block (`II*\0…` / `MM\0*…`) into its directories.
pub fn parse_tiff(data: &[u8]) -> Result<MetadataBlock> {
    let order = read_header(data)?;
    let mut reader = TiffReader {
        data,
        order,
        visited: HashSet::new(),
    };
    let mut block = MetadataBlock::new(order);

    let ifd0_offset = order.read_u32(&data[4..8]);
    let (mut primary, next) = reader.read_ifd(ifd0_offset, IfdKind::Primary)?;

    if let Some(offset) = take_pointer(&mut primary, TAG_EXIF_IFD_POINTER)? {
        let (mut exif, _) = reader.read_ifd(offset, IfdKind::Exif)?;
        if let Some(offset) = take_pointer(&mut exif, TAG_INTEROP_IFD_POINTER)? {
            block.interop = reader.read_ifd(offset, IfdKind::Interop)?.0;
        }
        block.exif = exif;
    }

    if let Some(offset) = take_pointer(&mut primary, TAG_GPS_IFD_POINTER)? {
        block.gps = reader.read_ifd(offset, IfdKind::Gps)?.0;
    }

    if next != 0 {
        let (mut thumbnail, tail) = reader.read_ifd(next, IfdKind::Thumbnail)?;
        block.thumbnail_data = reader.take_thumbnail(&mut thumbnail)?;
        block.thumbnail = thumbnail;
        if tail != 0 {
            log::debug!("IFD chain continues past 1st at offset {tail}");
            block.next_ifd = Some(tail);
        }
    }

    block.primary = primary;
    Ok(block)
}

/// Validate the 8-byte TIFF header and return its byte order.
pub fn read_header(data: &[u8]) -> Result<Endian> {
    if data.len() < 8 {
        return Err(ExifError::malformed("TIFF header truncated"));
    }
    let order = match &data[0..2] {
        b"II" => Endian::Little,
        b"MM" => Endian::Big,
        _ => return Err(ExifError::malformed("invalid TIFF byte order")),
    };
    if order.read_u16(&data[2..4]) != 42 {
        return Err(ExifError::malformed("invalid TIFF magic number"));
    }
    Ok(order)
}

struct TiffReader<'a> {
    data: &'a [u8],
    order: Endian,
    visited: HashSet<u32>,
}

impl<'a> TiffReader<'a> {
    /// Bounds-checked slice of `len` bytes at `offset`.
    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ExifError::malformed(format!(
                    "range {offset}+{len} outside {}-byte block",
                    self.data.len()
                ))
            })?;
        Ok(&self.data[offset..end])
    }

    /// Read one IFD, returning its entries and the next-IFD offset.
    fn read_ifd(&mut self, offset: u32, kind: IfdKind) -> Result<(Directory, u32)> {
        if !self.visited.insert(offset) {
            return Err(ExifError::malformed(format!(
                "{kind} IFD at offset {offset} is referenced twice"
            )));
        }

        let start = offset as usize;
        let count = self.order.read_u16(self.slice(start, 2)?) as usize;
        let entries = self.slice(start + 2, count * ENTRY_SIZE)?;

        let mut dir = Directory::new();
        for raw in entries.chunks_exact(ENTRY_SIZE) {
            let (tag, value) = self.read_entry(raw, kind)?;
            dir.insert(tag, value);
        }

        // A missing next pointer is common in the wild; treat it as end of chain
        let next_pos = start + 2 + count * ENTRY_SIZE;
        let next = match self.slice(next_pos, 4) {
            Ok(bytes) => self.order.read_u32(bytes),
            Err(_) => {
                log::debug!("{kind} IFD has no next-IFD pointer");
                0
            }
        };

        Ok((dir, next))
    }

    fn read_entry(&self, raw: &[u8], kind: IfdKind) -> Result<(u16, TagValue)> {
        let tag = self.order.read_u16(&raw[0..2]);
        let type_code = self.order.read_u16(&raw[2..4]);
        let count = self.order.read_u32(&raw[4..8]) as usize;

        let tag_type = TagType::from_code(type_code).ok_or_else(|| {
            ExifError::malformed(format!(
                "{kind} tag 0x{tag:04x} has unknown type code {type_code}"
            ))
        })?;

        let size = count.checked_mul(tag_type.unit_size()).ok_or_else(|| {
            ExifError::malformed(format!("{kind} tag 0x{tag:04x} count overflows"))
        })?;

        let bytes = if size <= 4 {
            &raw[8..8 + size]
        } else {
            let offset = self.order.read_u32(&raw[8..12]) as usize;
            self.slice(offset, size).map_err(|_| {
                ExifError::malformed(format!(
                    "{kind} tag 0x{tag:04x} value at {offset} (+{size}) is out of bounds"
                ))
            })?
        };

        Ok((tag, TagValue::decode(tag_type, bytes, self.order)))
    }

    /// Pull the JPEG thumbnail referenced by the `1st` IFD out of the block.
    fn take_thumbnail(&self, thumbnail: &mut Directory) -> Result<Option<Vec<u8>>> {
        let offset = take_pointer(thumbnail, TAG_JPEG_INTERCHANGE_FORMAT)?;
        let length = take_pointer(thumbnail, TAG_JPEG_INTERCHANGE_FORMAT_LENGTH)?;
        match (offset, length) {
            (Some(offset), Some(length)) => {
                let bytes = self
                    .slice(offset as usize, length as usize)
                    .map_err(|_| ExifError::malformed("thumbnail data out of bounds"))?;
                Ok(Some(bytes.to_vec()))
            }
            (None, None) => Ok(None),
            _ => Err(ExifError::malformed(
                "thumbnail offset and length must appear together",
            )),
        }
    }
}

/// Remove a pointer-style tag and return its offset value.
fn take_pointer(dir: &mut Directory, tag: u16) -> Result<Option<u32>> {
    match dir.remove(&tag) {
        None => Ok(None),
        Some(value) => value.first_offset().map(Some).ok_or_else(|| {
            ExifError::malformed(format!("pointer tag 0x{tag:04x} is not an integer offset"))
        }),
    }
}
