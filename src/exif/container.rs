//! Locating and replacing the EXIF block inside JPEG, TIFF, and WebP files.

use img_parts::jpeg::Jpeg;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};

use super::reader::{parse_tiff, read_header};
use super::writer::encode_at;
use crate::error::{ExifError, Result};

const EXIF_PREFIX: &[u8] = b"Exif\0\0";
const APP1: u8 = 0xE1;
/// Largest APP1 payload: the 16-bit length field also counts itself.
const MAX_APP1_CONTENTS: usize = u16::MAX as usize - 2;

/// Image container families that can carry an EXIF block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Jpeg,
    Tiff,
    WebP,
}

impl Container {
    /// Identify the container from its leading magic bytes.
    pub fn detect(data: &[u8]) -> Result<Self> {
        if data.starts_with(&[0xFF, 0xD8]) {
            Ok(Self::Jpeg)
        } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
            Ok(Self::Tiff)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Ok(Self::WebP)
        } else {
            Err(ExifError::UnsupportedContainer)
        }
    }
}

/// Return the raw TIFF-structured EXIF block embedded in `data`.
pub fn extract_tiff(data: &[u8]) -> Result<Vec<u8>> {
    match Container::detect(data)? {
        Container::Tiff => Ok(data.to_vec()),
        Container::Jpeg => {
            let jpeg = parse_jpeg(data)?;
            let exif = jpeg.exif().ok_or(ExifError::MissingMetadata)?;
            Ok(exif.to_vec())
        }
        Container::WebP => {
            let webp = parse_webp(data)?;
            let exif = webp.exif().ok_or(ExifError::MissingMetadata)?;
            // Some writers keep the JPEG-style prefix inside the chunk
            let tiff = exif.strip_prefix(EXIF_PREFIX).unwrap_or(&exif);
            Ok(tiff.to_vec())
        }
    }
}

/// Replace the EXIF block of `original` with `tiff`, returning the new file.
///
/// JPEG and WebP get their existing APP1 segment / `EXIF` chunk swapped. For
/// TIFF the original bytes stay put so strip and tile offsets remain valid:
/// the new directories are laid out after the end of the file and the header
/// is repointed at them.
pub fn splice(original: &[u8], tiff: &[u8]) -> Result<Vec<u8>> {
    match Container::detect(original)? {
        Container::Jpeg => splice_jpeg(original, tiff),
        Container::WebP => splice_webp(original, tiff),
        Container::Tiff => splice_tiff(original, tiff),
    }
}

fn parse_jpeg(data: &[u8]) -> Result<Jpeg> {
    Jpeg::from_bytes(Bytes::copy_from_slice(data))
        .map_err(|e| ExifError::malformed(format!("invalid JPEG structure: {e}")))
}

fn parse_webp(data: &[u8]) -> Result<WebP> {
    WebP::from_bytes(Bytes::copy_from_slice(data))
        .map_err(|e| ExifError::malformed(format!("invalid WebP structure: {e}")))
}

/// Find the position of the EXIF APP1 segment in a JPEG.
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}

fn splice_jpeg(original: &[u8], tiff: &[u8]) -> Result<Vec<u8>> {
    if tiff.len() + EXIF_PREFIX.len() > MAX_APP1_CONTENTS {
        return Err(ExifError::ValueTooLarge(format!(
            "{}-byte EXIF block does not fit in a JPEG APP1 segment",
            tiff.len()
        )));
    }

    let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(original))
        .map_err(|e| ExifError::Splice(format!("invalid JPEG structure: {e}")))?;
    let orig_pos = find_exif_segment_pos(&jpeg)
        .ok_or_else(|| ExifError::Splice("JPEG has no APP1 EXIF segment".into()))?;

    jpeg.set_exif(Some(Bytes::copy_from_slice(tiff)));

    // set_exif() re-inserts the segment at a fixed position; put it back
    // where it was so segment order is unchanged.
    let new_pos = find_exif_segment_pos(&jpeg)
        .ok_or_else(|| ExifError::Splice("EXIF segment vanished after update".into()))?;
    if new_pos != orig_pos {
        let segments = jpeg.segments_mut();
        let seg = segments.remove(new_pos);
        segments.insert(orig_pos.min(segments.len()), seg);
    }

    Ok(jpeg.encoder().bytes().to_vec())
}

fn splice_webp(original: &[u8], tiff: &[u8]) -> Result<Vec<u8>> {
    let mut webp = WebP::from_bytes(Bytes::copy_from_slice(original))
        .map_err(|e| ExifError::Splice(format!("invalid WebP structure: {e}")))?;
    if webp.exif().is_none() {
        return Err(ExifError::Splice("WebP has no EXIF chunk".into()));
    }

    webp.set_exif(Some(Bytes::copy_from_slice(tiff)));
    Ok(webp.encoder().bytes().to_vec())
}

fn splice_tiff(original: &[u8], tiff: &[u8]) -> Result<Vec<u8>> {
    let order = read_header(original)
        .map_err(|e| ExifError::Splice(format!("cannot rewrite TIFF header: {e}")))?;

    let mut block = parse_tiff(tiff)?;
    block.byte_order = order;
    // Pages after the second live in the original bytes; keep them chained
    block.next_ifd = parse_tiff(original)?.next_ifd;

    let base = u32::try_from(original.len())
        .map_err(|_| ExifError::ValueTooLarge("TIFF file exceeds 4 GiB".into()))?;
    let (ifd0, ifds) = encode_at(&block, base)?;

    let mut out = Vec::with_capacity(original.len() + ifds.len());
    out.extend_from_slice(original);
    out.extend_from_slice(&ifds);
    order.patch_u32(&mut out, 4, ifd0);
    Ok(out)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic containers for codec and pipeline tests.

    use crate::exif::encode;
    use crate::exif::ifd::MetadataBlock;
    use crate::exif::value::{Endian, Rational, TagValue};

    /// Baseline scan stub: SOS header, a few entropy bytes, EOI.
    const SCAN: &[u8] = &[
        0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0x12, 0x34, 0x56, 0xFF, 0xD9,
    ];

    /// Block with `Make = "Acme"`, a resolution, and an Exif date.
    pub fn acme_block() -> MetadataBlock {
        let mut block = MetadataBlock::new(Endian::Little);
        block.primary.insert(0x010F, TagValue::ascii("Acme"));
        block
            .primary
            .insert(0x011A, TagValue::Rational(vec![Rational { num: 72, denom: 1 }]));
        block
            .exif
            .insert(0x9003, TagValue::ascii("2024:05:01 12:00:00"));
        block
    }

    fn segment(marker: u8, contents: &[u8]) -> Vec<u8> {
        let mut seg = vec![0xFF, marker];
        seg.extend_from_slice(&((contents.len() + 2) as u16).to_be_bytes());
        seg.extend_from_slice(contents);
        seg
    }

    /// JPEG with APP0 (JFIF), APP1 (EXIF), COM, then the scan.
    pub fn jpeg_with(block: &MetadataBlock) -> Vec<u8> {
        let mut exif = b"Exif\0\0".to_vec();
        exif.extend_from_slice(&encode(block).unwrap());

        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
        data.extend(segment(0xE1, &exif));
        data.extend(segment(0xFE, b"fixture"));
        data.extend_from_slice(SCAN);
        data
    }

    /// JPEG without any metadata segment.
    pub fn bare_jpeg() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend(segment(0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
        data.extend_from_slice(SCAN);
        data
    }

    fn chunk(id: &[u8; 4], contents: &[u8]) -> Vec<u8> {
        let mut c = id.to_vec();
        c.extend_from_slice(&(contents.len() as u32).to_le_bytes());
        c.extend_from_slice(contents);
        if contents.len() % 2 == 1 {
            c.push(0);
        }
        c
    }

    /// Extended WebP (VP8X) carrying an EXIF chunk.
    pub fn webp_with(block: &MetadataBlock) -> Vec<u8> {
        // VP8X: EXIF flag, 1x1 canvas (stored minus one)
        let vp8x = [0x08, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut body = b"WEBP".to_vec();
        body.extend(chunk(b"VP8X", &vp8x));
        body.extend(chunk(b"VP8L", &[0x2F, 0, 0, 0, 0x10, 0x07, 0x10, 0x11, 0x11, 0x88, 0x88, 0x08]));
        body.extend(chunk(b"EXIF", &encode(block).unwrap()));

        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&(body.len() as u32).to_le_bytes());
        data.extend(body);
        data
    }

    /// TIFF file: header, 4 bytes of "pixel data" at offset 8, then IFD0
    /// with a strip pointing at that data.
    pub fn tiff_with_strip() -> Vec<u8> {
        let mut data = b"II*\0".to_vec();
        data.extend_from_slice(&12u32.to_le_bytes());
        data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        // IFD0 at 12: Make (inline "Abc\0"), StripOffsets = 8, StripByteCounts = 4
        data.extend_from_slice(&3u16.to_le_bytes());
        for (tag, ty, value) in [
            (0x010Fu16, 2u16, *b"Abc\0"),
            (0x0111, 4, 8u32.to_le_bytes()),
            (0x0117, 4, 4u32.to_le_bytes()),
        ] {
            data.extend_from_slice(&tag.to_le_bytes());
            data.extend_from_slice(&ty.to_le_bytes());
            data.extend_from_slice(&(if ty == 2 { 4u32 } else { 1 }).to_le_bytes());
            data.extend_from_slice(&value);
        }
        data.extend_from_slice(&0u32.to_le_bytes());
        data
    }

    /// Three-page TIFF: IFD0 at 8, IFD1 at 26, IFD2 at 44, one entry each.
    pub fn three_page_tiff() -> Vec<u8> {
        let mut data = b"II*\0".to_vec();
        data.extend_from_slice(&8u32.to_le_bytes());
        for (tag, ty, value, next) in [
            (0x010Fu16, 2u16, *b"Ab\0\0", 26u32),
            (0x0100, 3, [2, 0, 0, 0], 44),
            (0x0100, 3, [3, 0, 0, 0], 0),
        ] {
            data.extend_from_slice(&1u16.to_le_bytes());
            data.extend_from_slice(&tag.to_le_bytes());
            data.extend_from_slice(&ty.to_le_bytes());
            data.extend_from_slice(&(if ty == 2 { 3u32 } else { 1 }).to_le_bytes());
            data.extend_from_slice(&value);
            data.extend_from_slice(&next.to_le_bytes());
        }
        data
    }
}
