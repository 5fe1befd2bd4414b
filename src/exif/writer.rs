//! TIFF-structure encoder and atomic file replacement.
//!
//! Layout: each IFD is reserved up front (count + 12-byte entries + next
//! pointer), its oversized values follow it word-aligned, and pointer tags
//! to sub-IFDs and the thumbnail are patched once their targets are placed.

use std::io::Write;
use std::path::Path;

use super::ifd::{Directory, MetadataBlock};
use super::tags::{
    TAG_EXIF_IFD_POINTER, TAG_GPS_IFD_POINTER, TAG_INTEROP_IFD_POINTER,
    TAG_JPEG_INTERCHANGE_FORMAT, TAG_JPEG_INTERCHANGE_FORMAT_LENGTH,
};
use super::value::{Endian, TagType, TagValue};
use crate::error::{ExifError, Result};

const ENTRY_SIZE: usize = 12;

/// Encode a block as a standalone TIFF structure: header, then IFDs.
pub fn encode(block: &MetadataBlock) -> Result<Vec<u8>> {
    let order = block.byte_order;
    let mut writer = IfdWriter::new(order, 0);
    writer.buf.extend_from_slice(order.marker());
    order.put_u16(&mut writer.buf, 42);
    order.put_u32(&mut writer.buf, 8);

    if let Some(offset) = block.next_ifd {
        log::debug!("Dropping IFD chain after 1st (offset {offset}) from standalone block");
    }
    let ifd0 = writer.write_block(block, None)?;
    debug_assert_eq!(ifd0, 8);
    Ok(writer.buf)
}

/// Lay out a block's IFDs as if the bytes were placed at absolute offset
/// `base` of an existing TIFF file. Returns the IFD0 offset and the bytes.
///
/// [`MetadataBlock::next_ifd`] is linked after `1st`, so later pages of the
/// file stay in the chain.
pub(crate) fn encode_at(block: &MetadataBlock, base: u32) -> Result<(u32, Vec<u8>)> {
    let mut writer = IfdWriter::new(block.byte_order, base);
    let ifd0 = writer.write_block(block, block.next_ifd)?;
    Ok((ifd0, writer.buf))
}

/// An entry the writer fills in itself rather than taking from a directory.
#[derive(Clone, Copy)]
enum Synthesized {
    /// Offset of a sub-IFD or the thumbnail, patched later.
    Offset,
    /// A known LONG value.
    Long(u32),
}

enum Field<'a> {
    Value(&'a TagValue),
    Synthesized(Synthesized),
}

/// Where a written IFD landed and which of its slots still need patching.
struct PlacedIfd {
    offset: u32,
    next_pos: usize,
    slots: Vec<(u16, usize)>,
}

impl PlacedIfd {
    fn slot(&self, tag: u16) -> Option<usize> {
        self.slots.iter().find(|(t, _)| *t == tag).map(|&(_, pos)| pos)
    }
}

struct IfdWriter {
    order: Endian,
    base: u32,
    buf: Vec<u8>,
}

impl IfdWriter {
    fn new(order: Endian, base: u32) -> Self {
        Self {
            order,
            base,
            buf: Vec::new(),
        }
    }

    /// Absolute offset of the next byte to be written.
    fn offset(&self) -> Result<u32> {
        u32::try_from(self.buf.len())
            .ok()
            .and_then(|len| self.base.checked_add(len))
            .ok_or_else(|| ExifError::ValueTooLarge("metadata exceeds 4 GiB of offsets".into()))
    }

    /// TIFF values and IFDs begin on word boundaries.
    fn align(&mut self) {
        if (self.base as usize + self.buf.len()) % 2 != 0 {
            self.buf.push(0);
        }
    }

    fn patch(&mut self, pos: usize, value: u32) {
        self.order.patch_u32(&mut self.buf, pos, value);
    }

    /// Write every directory. `tail` becomes the next-IFD pointer of `1st`.
    fn write_block(&mut self, block: &MetadataBlock, tail: Option<u32>) -> Result<u32> {
        let has_interop = !block.interop.is_empty();
        let has_exif = !block.exif.is_empty() || has_interop;
        let has_gps = !block.gps.is_empty();
        let has_thumbnail =
            !block.thumbnail.is_empty() || block.thumbnail_data.is_some() || tail.is_some();

        let mut extras = Vec::new();
        if has_exif {
            extras.push((TAG_EXIF_IFD_POINTER, Synthesized::Offset));
        }
        if has_gps {
            extras.push((TAG_GPS_IFD_POINTER, Synthesized::Offset));
        }
        let ifd0 = self.write_ifd(
            &block.primary,
            &[TAG_EXIF_IFD_POINTER, TAG_GPS_IFD_POINTER],
            &extras,
        )?;

        if has_exif {
            let extras = if has_interop {
                vec![(TAG_INTEROP_IFD_POINTER, Synthesized::Offset)]
            } else {
                Vec::new()
            };
            let exif = self.write_ifd(&block.exif, &[TAG_INTEROP_IFD_POINTER], &extras)?;
            self.link(&ifd0, TAG_EXIF_IFD_POINTER, exif.offset);

            if has_interop {
                let interop = self.write_ifd(&block.interop, &[], &[])?;
                self.link(&exif, TAG_INTEROP_IFD_POINTER, interop.offset);
            }
        }

        if has_gps {
            let gps = self.write_ifd(&block.gps, &[], &[])?;
            self.link(&ifd0, TAG_GPS_IFD_POINTER, gps.offset);
        }

        if has_thumbnail {
            let mut extras = Vec::new();
            if let Some(data) = &block.thumbnail_data {
                let len = u32::try_from(data.len())
                    .map_err(|_| ExifError::ValueTooLarge("thumbnail exceeds 4 GiB".into()))?;
                extras.push((TAG_JPEG_INTERCHANGE_FORMAT, Synthesized::Offset));
                extras.push((TAG_JPEG_INTERCHANGE_FORMAT_LENGTH, Synthesized::Long(len)));
            }
            let thumbnail = self.write_ifd(
                &block.thumbnail,
                &[TAG_JPEG_INTERCHANGE_FORMAT, TAG_JPEG_INTERCHANGE_FORMAT_LENGTH],
                &extras,
            )?;
            self.patch(ifd0.next_pos, thumbnail.offset);
            if let Some(tail) = tail {
                self.patch(thumbnail.next_pos, tail);
            }

            if let Some(data) = &block.thumbnail_data {
                self.align();
                let offset = self.offset()?;
                self.buf.extend_from_slice(data);
                self.link(&thumbnail, TAG_JPEG_INTERCHANGE_FORMAT, offset);
            }
        }

        Ok(ifd0.offset)
    }

    fn link(&mut self, ifd: &PlacedIfd, tag: u16, target: u32) {
        if let Some(pos) = ifd.slot(tag) {
            self.patch(pos, target);
        }
    }

    /// Write one IFD and its out-of-line values. Directory entries whose tag
    /// is in `reserved` are dropped; the writer owns those slots.
    fn write_ifd(
        &mut self,
        dir: &Directory,
        reserved: &[u16],
        extras: &[(u16, Synthesized)],
    ) -> Result<PlacedIfd> {
        let mut fields: Vec<(u16, Field<'_>)> = dir
            .iter()
            .filter(|(tag, _)| !reserved.contains(*tag))
            .map(|(&tag, value)| (tag, Field::Value(value)))
            .chain(extras.iter().map(|&(tag, s)| (tag, Field::Synthesized(s))))
            .collect();
        fields.sort_by_key(|(tag, _)| *tag);

        let count = u16::try_from(fields.len()).map_err(|_| {
            ExifError::ValueTooLarge(format!("{} entries in one IFD", fields.len()))
        })?;

        self.align();
        let offset = self.offset()?;
        let start = self.buf.len();
        self.order.put_u16(&mut self.buf, count);
        self.buf.resize(start + 2 + fields.len() * ENTRY_SIZE + 4, 0);
        let next_pos = start + 2 + fields.len() * ENTRY_SIZE;

        let mut slots = Vec::new();
        for (i, (tag, field)) in fields.iter().enumerate() {
            let pos = start + 2 + i * ENTRY_SIZE;
            let mut entry = Vec::with_capacity(ENTRY_SIZE);
            self.order.put_u16(&mut entry, *tag);

            match field {
                Field::Value(value) => {
                    let n = u32::try_from(value.count()).map_err(|_| {
                        ExifError::ValueTooLarge(format!(
                            "tag 0x{tag:04x} has {} elements",
                            value.count()
                        ))
                    })?;
                    let bytes = value.encode(self.order);
                    self.order.put_u16(&mut entry, value.tag_type().code());
                    self.order.put_u32(&mut entry, n);
                    if bytes.len() <= 4 {
                        entry.extend_from_slice(&bytes);
                        entry.resize(ENTRY_SIZE, 0);
                    } else {
                        self.align();
                        let value_offset = self.offset()?;
                        self.buf.extend_from_slice(&bytes);
                        self.order.put_u32(&mut entry, value_offset);
                    }
                }
                Field::Synthesized(s) => {
                    self.order.put_u16(&mut entry, TagType::Long.code());
                    self.order.put_u32(&mut entry, 1);
                    match s {
                        Synthesized::Offset => {
                            slots.push((*tag, pos + 8));
                            self.order.put_u32(&mut entry, 0);
                        }
                        Synthesized::Long(v) => self.order.put_u32(&mut entry, *v),
                    }
                }
            }

            self.buf[pos..pos + ENTRY_SIZE].copy_from_slice(&entry);
        }

        Ok(PlacedIfd {
            offset,
            next_pos,
            slots,
        })
    }
}

/// Replace `path` with `bytes` without ever leaving a partially written file.
///
/// The data goes to a temporary file in the same directory, which is synced
/// and then renamed over the original. The original permissions are kept.
/// A symlink is resolved first, so its target is replaced and the link stays.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let real = std::fs::canonicalize(path).map_err(|e| ExifError::io(path, e))?;
    let path = real.as_path();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let permissions = std::fs::metadata(path)
        .map_err(|e| ExifError::io(path, e))?
        .permissions();

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ExifError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| ExifError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ExifError::io(tmp.path(), e))?;
    std::fs::set_permissions(tmp.path(), permissions).map_err(|e| ExifError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| ExifError::io(path, e.error))?;

    log::debug!("Replaced {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
