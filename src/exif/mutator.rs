//! Applying an [`EditSet`] to a decoded block.
//!
//! Each field name is resolved against the primary, Exif, and GPS groups in
//! that order; the first group that knows the name receives the value. The
//! value is coerced to the type of the entry already present, or to the
//! dictionary type when the tag is new. Fields that cannot be resolved or
//! coerced are reported and leave the block untouched.

use super::ifd::{IfdKind, MetadataBlock};
use super::tags::{TAG_USER_COMMENT, TagDictionary, is_xp_tag};
use super::value::{Rational, SRational, TagType, TagValue};
use crate::config::{EditSet, EditValue};
use crate::error::ExifError;

/// Groups an edit may land in, highest priority first.
const EDITABLE_GROUPS: [IfdKind; 3] = [IfdKind::Primary, IfdKind::Exif, IfdKind::Gps];

/// Character-code prefix for ASCII user comments.
const USER_COMMENT_ASCII: &[u8; 8] = b"ASCII\0\0\0";

/// Largest denominator tried when turning a decimal into a fraction.
const MAX_DECIMAL_DENOM: i64 = 1_000_000;

/// What happened to one field of an edit set.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Applied { name: String, ifd: IfdKind, tag: u16 },
    Unknown { name: String },
    CoercionFailed { name: String, reason: String },
}

impl EditOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Applied { name, .. }
            | Self::Unknown { name }
            | Self::CoercionFailed { name, .. } => name,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// The failure as an error value, for logging.
    pub fn error(&self) -> Option<ExifError> {
        match self {
            Self::Applied { .. } => None,
            Self::Unknown { name } => Some(ExifError::UnknownTag(name.clone())),
            Self::CoercionFailed { name, reason } => Some(ExifError::CoercionFailed {
                name: name.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Apply every field of `edits` to `block`, returning one outcome per field
/// in the edit set's iteration order.
pub fn apply(block: &mut MetadataBlock, edits: &EditSet, dict: &TagDictionary) -> Vec<EditOutcome> {
    edits
        .iter()
        .map(|(name, value)| apply_field(block, name, value, dict))
        .collect()
}

fn apply_field(
    block: &mut MetadataBlock,
    name: &str,
    value: &EditValue,
    dict: &TagDictionary,
) -> EditOutcome {
    let Some(info) = EDITABLE_GROUPS
        .iter()
        .find_map(|&group| dict.resolve(group, name).ok())
    else {
        return EditOutcome::Unknown {
            name: name.to_string(),
        };
    };

    let dir = block.directory_mut(info.group);
    let target = dir.get(&info.id).map_or(info.tag_type, TagValue::tag_type);

    match coerce(info.id, target, value) {
        Ok(coerced) => {
            log::debug!("{name} → {} 0x{:04x} ({target})", info.group, info.id);
            dir.insert(info.id, coerced);
            EditOutcome::Applied {
                name: name.to_string(),
                ifd: info.group,
                tag: info.id,
            }
        }
        Err(reason) => EditOutcome::CoercionFailed {
            name: name.to_string(),
            reason,
        },
    }
}

type Coerced<T> = Result<T, String>;

/// Convert an edit-file value to a field of type `ty` for tag `tag`.
fn coerce(tag: u16, ty: TagType, value: &EditValue) -> Coerced<TagValue> {
    match ty {
        TagType::Ascii => ascii(value).map(|text| TagValue::ascii(&text)),
        TagType::Byte if is_xp_tag(tag) => match value {
            EditValue::Text(text) => Ok(TagValue::Byte(encode_utf16le(text))),
            _ => Err("expected text for a Windows XP tag".into()),
        },
        TagType::Byte => ranged(value, ty).map(TagValue::Byte),
        TagType::Short => ranged(value, ty).map(TagValue::Short),
        TagType::Long => ranged(value, ty).map(TagValue::Long),
        TagType::SByte => ranged(value, ty).map(TagValue::SByte),
        TagType::SShort => ranged(value, ty).map(TagValue::SShort),
        TagType::SLong => ranged(value, ty).map(TagValue::SLong),
        TagType::Rational => fractions(value)?
            .into_iter()
            .map(|(num, denom)| -> Coerced<Rational> {
                Ok(Rational {
                    num: narrow(num, ty)?,
                    denom: narrow(denom, ty)?,
                })
            })
            .collect::<Coerced<_>>()
            .map(TagValue::Rational),
        TagType::SRational => fractions(value)?
            .into_iter()
            .map(|(num, denom)| -> Coerced<SRational> {
                Ok(SRational {
                    num: narrow(num, ty)?,
                    denom: narrow(denom, ty)?,
                })
            })
            .collect::<Coerced<_>>()
            .map(TagValue::SRational),
        TagType::Undefined => undefined(tag, value).map(TagValue::Undefined),
        TagType::Float => numbers(value)?
            .into_iter()
            .map(|x| {
                let narrowed = x as f32;
                if narrowed.is_finite() {
                    Ok(narrowed)
                } else {
                    Err(format!("{x} is out of range for {ty}"))
                }
            })
            .collect::<Coerced<_>>()
            .map(TagValue::Float),
        TagType::Double => numbers(value).map(TagValue::Double),
    }
}

fn ascii(value: &EditValue) -> Coerced<String> {
    let text = match value {
        EditValue::Text(text) => text.clone(),
        EditValue::Integer(n) => n.to_string(),
        EditValue::Float(x) => x.to_string(),
        other => return Err(format!("expected a single text value, got {other}")),
    };
    if text.contains('\0') {
        return Err("text contains a NUL character".into());
    }
    if !text.is_ascii() {
        return Err(format!("{text:?} has non-ASCII characters"));
    }
    Ok(text)
}

/// Windows XP tags hold NUL-terminated UTF-16LE text in a BYTE array.
fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = text.encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

fn undefined(tag: u16, value: &EditValue) -> Coerced<Vec<u8>> {
    match value {
        EditValue::Text(text) if tag == TAG_USER_COMMENT => {
            let mut bytes = USER_COMMENT_ASCII.to_vec();
            bytes.extend_from_slice(text.as_bytes());
            Ok(bytes)
        }
        EditValue::Text(text) => Ok(text.as_bytes().to_vec()),
        other => ranged(other, TagType::Undefined),
    }
}

/// A scalar or flat list of integers.
fn integers(value: &EditValue) -> Coerced<Vec<i64>> {
    match value {
        EditValue::Integer(n) => Ok(vec![*n]),
        EditValue::List(items) if !items.is_empty() => items
            .iter()
            .map(|item| match item {
                EditValue::Integer(n) => Ok(*n),
                other => Err(format!("expected an integer, got {other}")),
            })
            .collect(),
        EditValue::List(_) => Err("empty list".into()),
        other => Err(format!("expected an integer, got {other}")),
    }
}

fn narrow<T: TryFrom<i64>>(n: i64, ty: TagType) -> Coerced<T> {
    T::try_from(n).map_err(|_| format!("{n} is out of range for {ty}"))
}

fn ranged<T: TryFrom<i64>>(value: &EditValue, ty: TagType) -> Coerced<Vec<T>> {
    integers(value)?.into_iter().map(|n| narrow(n, ty)).collect()
}

/// A scalar or flat list of numbers, integers widened to floats.
fn numbers(value: &EditValue) -> Coerced<Vec<f64>> {
    let number = |v: &EditValue| match v {
        EditValue::Integer(n) => Ok(*n as f64),
        EditValue::Float(x) => Ok(*x),
        other => Err(format!("expected a number, got {other}")),
    };
    match value {
        EditValue::List(items) if items.is_empty() => Err("empty list".into()),
        EditValue::List(items) => items.iter().map(number).collect(),
        scalar => Ok(vec![number(scalar)?]),
    }
}

/// One or more fractions.
///
/// A two-integer list is a single `[numerator, denominator]` pair; any other
/// list is one fraction per element.
fn fractions(value: &EditValue) -> Coerced<Vec<(i64, i64)>> {
    let out = match value {
        EditValue::List(items) if items.is_empty() => return Err("empty list".into()),
        EditValue::List(items) => match items.as_slice() {
            [EditValue::Integer(num), EditValue::Integer(denom)] => vec![(*num, *denom)],
            _ => items.iter().map(fraction).collect::<Coerced<_>>()?,
        },
        scalar => vec![fraction(scalar)?],
    };
    if out.iter().any(|&(_, denom)| denom == 0) {
        return Err("denominator must be non-zero".into());
    }
    Ok(out)
}

fn fraction(value: &EditValue) -> Coerced<(i64, i64)> {
    match value {
        EditValue::Integer(n) => Ok((*n, 1)),
        EditValue::Float(x) => decimal_fraction(*x),
        EditValue::Text(text) => parse_fraction(text),
        EditValue::List(items) => match items.as_slice() {
            [EditValue::Integer(num), EditValue::Integer(denom)] => Ok((*num, *denom)),
            _ => Err("expected a [numerator, denominator] pair".into()),
        },
        other => Err(format!("expected a fraction, got {other}")),
    }
}

/// `"n/d"`, or a decimal such as `"2.8"`.
fn parse_fraction(text: &str) -> Coerced<(i64, i64)> {
    let text = text.trim();
    if let Some((num, denom)) = text.split_once('/') {
        let parse = |s: &str| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| format!("`{text}` is not a fraction"))
        };
        return Ok((parse(num)?, parse(denom)?));
    }
    match text.parse::<f64>() {
        Ok(x) => decimal_fraction(x),
        Err(_) => Err(format!("`{text}` is not a number")),
    }
}

/// Exact fraction for decimals with up to six places, reduced.
fn decimal_fraction(x: f64) -> Coerced<(i64, i64)> {
    if !x.is_finite() {
        return Err(format!("{x} is not a finite number"));
    }
    let mut denom = 1i64;
    while (x * denom as f64).fract().abs() > 1e-9 && denom < MAX_DECIMAL_DENOM {
        denom *= 10;
    }
    let scaled = (x * denom as f64).round();
    if scaled.abs() >= i64::MAX as f64 {
        return Err(format!("{x} is too large"));
    }
    let num = scaled as i64;
    let g = gcd(num.unsigned_abs(), denom.unsigned_abs()) as i64;
    Ok((num / g, denom / g))
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}
