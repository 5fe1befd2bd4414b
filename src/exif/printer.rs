//! Human-readable and JSON renderings of a decoded block.

use std::fmt::Display;
use std::path::Path;

use serde_json::{Map, Value, json};

use super::ifd::{IfdKind, MetadataBlock};
use super::tags::{TAG_USER_COMMENT, TagDictionary, is_xp_tag};
use super::value::{Endian, TagValue};

/// Directories shown in reports, in order. Interop is preserved but not shown.
const PRINTED_GROUPS: [IfdKind; 4] = [
    IfdKind::Primary,
    IfdKind::Exif,
    IfdKind::Gps,
    IfdKind::Thumbnail,
];

/// Blobs up to this size are printed element by element.
const MAX_INLINE_BLOB: usize = 16;

/// One `"<Name> <value>"` line per entry, grouped `0th`, `Exif`, `GPS`, `1st`.
pub fn render(block: &MetadataBlock, dict: &TagDictionary) -> Vec<String> {
    PRINTED_GROUPS
        .iter()
        .flat_map(|&group| {
            block.directory(group).iter().map(move |(&id, value)| {
                format!(
                    "{} {}",
                    dict.name_for(group, id),
                    format_value(group, id, value, block.byte_order)
                )
            })
        })
        .collect()
}

/// The per-file report: file name, an underline of dashes, one line per
/// entry, then a blank line.
pub fn render_report(path: &Path, block: &MetadataBlock, dict: &TagDictionary) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut out = format!("{name}\n{}\n", "-".repeat(name.chars().count()));
    for line in render(block, dict) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// `{ "0th": { "Make": "Acme", … }, "Exif": { … }, … }`; empty groups are omitted.
pub fn render_json(block: &MetadataBlock, dict: &TagDictionary) -> Value {
    let mut groups = Map::new();
    for group in PRINTED_GROUPS {
        let dir = block.directory(group);
        if dir.is_empty() {
            continue;
        }
        let fields: Map<String, Value> = dir
            .iter()
            .map(|(&id, value)| {
                (
                    dict.name_for(group, id).into_owned(),
                    json_value(group, id, value, block.byte_order),
                )
            })
            .collect();
        groups.insert(group.label().to_string(), Value::Object(fields));
    }
    Value::Object(groups)
}

/// Text for the value of one entry.
pub fn format_value(group: IfdKind, id: u16, value: &TagValue, order: Endian) -> String {
    if let Some(text) = decode_text(group, id, value, order) {
        return text;
    }
    match value {
        TagValue::Ascii(_) => value.as_text().unwrap_or_default(),
        TagValue::Byte(v) | TagValue::Undefined(v) if v.len() > MAX_INLINE_BLOB => {
            format!("<{} bytes>", v.len())
        }
        TagValue::Byte(v) | TagValue::Undefined(v) => join(v),
        TagValue::SByte(v) => join(v),
        TagValue::Short(v) => join(v),
        TagValue::Long(v) => join(v),
        TagValue::SShort(v) => join(v),
        TagValue::SLong(v) => join(v),
        TagValue::Rational(v) => join(v),
        TagValue::SRational(v) => join(v),
        TagValue::Float(v) => join(v),
        TagValue::Double(v) => join(v),
    }
}

fn json_value(group: IfdKind, id: u16, value: &TagValue, order: Endian) -> Value {
    fn numbers<T: Into<Value> + Copy>(v: &[T]) -> Value {
        match v {
            [single] => (*single).into(),
            _ => v.iter().copied().collect(),
        }
    }

    if decode_text(group, id, value, order).is_some() {
        return Value::String(format_value(group, id, value, order));
    }
    match value {
        TagValue::Short(v) => numbers(v),
        TagValue::Long(v) => numbers(v),
        TagValue::SByte(v) => numbers(v),
        TagValue::SShort(v) => numbers(v),
        TagValue::SLong(v) => numbers(v),
        TagValue::Float(v) => numbers(v),
        TagValue::Double(v) => numbers(v),
        TagValue::Byte(v) if v.len() <= MAX_INLINE_BLOB => numbers(v),
        TagValue::Rational(v) if v.len() > 1 => json!(v.iter().map(|r| r.to_string()).collect::<Vec<_>>()),
        TagValue::SRational(v) if v.len() > 1 => json!(v.iter().map(|r| r.to_string()).collect::<Vec<_>>()),
        _ => Value::String(format_value(group, id, value, order)),
    }
}

/// Text stored in a non-ASCII field: Windows `XP*` tags and `UserComment`.
fn decode_text(group: IfdKind, id: u16, value: &TagValue, order: Endian) -> Option<String> {
    match (group, value) {
        (IfdKind::Primary | IfdKind::Thumbnail, TagValue::Byte(bytes)) if is_xp_tag(id) => {
            Some(decode_utf16(bytes, Endian::Little))
        }
        (IfdKind::Exif, TagValue::Undefined(bytes)) if id == TAG_USER_COMMENT => {
            decode_user_comment(bytes, order)
        }
        _ => None,
    }
}

/// UserComment carries an 8-byte character-code prefix.
fn decode_user_comment(bytes: &[u8], order: Endian) -> Option<String> {
    let (code, body) = bytes.split_at_checked(8)?;
    match code {
        b"ASCII\0\0\0" | b"\0\0\0\0\0\0\0\0" => Some(trim_nuls(&String::from_utf8_lossy(body))),
        b"UNICODE\0" => Some(decode_utf16(body, order)),
        _ => None,
    }
}

fn decode_utf16(bytes: &[u8], order: Endian) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| order.read_u16(c)).collect();
    trim_nuls(&String::from_utf16_lossy(&units))
}

fn trim_nuls(text: &str) -> String {
    text.trim_end_matches('\0').trim_end().to_string()
}

fn join<T: Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
