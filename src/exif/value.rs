use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;

/// Byte order of a TIFF structure (`II` or `MM` in the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

macro_rules! endian_io {
    ($($read:ident, $write:ident, $put:ident => $ty:ty, $size:expr;)*) => {
        impl Endian {
            $(
                /// Reads from the start of `buf`, which must hold enough bytes.
                pub fn $read(self, buf: &[u8]) -> $ty {
                    match self {
                        Endian::Little => LittleEndian::$read(buf),
                        Endian::Big => BigEndian::$read(buf),
                    }
                }

                pub fn $put(self, out: &mut Vec<u8>, value: $ty) {
                    let mut bytes = [0u8; $size];
                    match self {
                        Endian::Little => LittleEndian::$write(&mut bytes, value),
                        Endian::Big => BigEndian::$write(&mut bytes, value),
                    }
                    out.extend_from_slice(&bytes);
                }
            )*
        }
    };
}

endian_io! {
    read_u16, write_u16, put_u16 => u16, 2;
    read_u32, write_u32, put_u32 => u32, 4;
    read_i16, write_i16, put_i16 => i16, 2;
    read_i32, write_i32, put_i32 => i32, 4;
    read_f32, write_f32, put_f32 => f32, 4;
    read_f64, write_f64, put_f64 => f64, 8;
}

impl Endian {
    /// The two-byte header marker for this order.
    pub fn marker(self) -> &'static [u8; 2] {
        match self {
            Endian::Little => b"II",
            Endian::Big => b"MM",
        }
    }

    /// Overwrites four bytes at `pos` with `value`.
    pub(crate) fn patch_u32(self, buf: &mut [u8], pos: usize, value: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(&mut buf[pos..pos + 4], value),
            Endian::Big => BigEndian::write_u32(&mut buf[pos..pos + 4], value),
        }
    }
}

/// TIFF field type codes 1 through 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
}

impl TagType {
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Size in bytes of a single element of this type.
    pub fn unit_size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Byte => "BYTE",
            Self::Ascii => "ASCII",
            Self::Short => "SHORT",
            Self::Long => "LONG",
            Self::Rational => "RATIONAL",
            Self::SByte => "SBYTE",
            Self::Undefined => "UNDEFINED",
            Self::SShort => "SSHORT",
            Self::SLong => "SLONG",
            Self::SRational => "SRATIONAL",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
        };
        f.write_str(name)
    }
}

/// Unsigned rational number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u32,
    pub denom: u32,
}

/// Signed rational number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SRational {
    pub num: i32,
    pub denom: i32,
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

impl fmt::Display for SRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

/// A decoded field value. The element count is the length of the vector
/// (for ASCII, the raw byte length including NUL terminators), so a value
/// always re-encodes to the type/count pair it was read with.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(Vec<u8>),
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<Rational>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<SRational>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl TagValue {
    /// NUL-terminated ASCII value.
    pub fn ascii(text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        Self::Ascii(bytes)
    }

    pub fn tag_type(&self) -> TagType {
        match self {
            Self::Byte(_) => TagType::Byte,
            Self::Ascii(_) => TagType::Ascii,
            Self::Short(_) => TagType::Short,
            Self::Long(_) => TagType::Long,
            Self::Rational(_) => TagType::Rational,
            Self::SByte(_) => TagType::SByte,
            Self::Undefined(_) => TagType::Undefined,
            Self::SShort(_) => TagType::SShort,
            Self::SLong(_) => TagType::SLong,
            Self::SRational(_) => TagType::SRational,
            Self::Float(_) => TagType::Float,
            Self::Double(_) => TagType::Double,
        }
    }

    /// Number of elements, as written to the entry's count field.
    pub fn count(&self) -> usize {
        match self {
            Self::Byte(v) | Self::Ascii(v) | Self::Undefined(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Rational(v) => v.len(),
            Self::SByte(v) => v.len(),
            Self::SShort(v) => v.len(),
            Self::SLong(v) => v.len(),
            Self::SRational(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
        }
    }

    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.count() * self.tag_type().unit_size()
    }

    /// Text of an ASCII value with trailing NULs removed.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Ascii(bytes) => {
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            _ => None,
        }
    }

    /// First element as an offset, for pointer-style tags.
    pub fn first_offset(&self) -> Option<u32> {
        match self {
            Self::Long(v) => v.first().copied(),
            Self::Short(v) => v.first().map(|&x| u32::from(x)),
            _ => None,
        }
    }

    /// Decodes `raw`, which must be exactly `count * unit_size` bytes.
    pub(crate) fn decode(ty: TagType, raw: &[u8], order: Endian) -> Self {
        match ty {
            TagType::Byte => Self::Byte(raw.to_vec()),
            TagType::Ascii => Self::Ascii(raw.to_vec()),
            TagType::Undefined => Self::Undefined(raw.to_vec()),
            TagType::SByte => Self::SByte(raw.iter().map(|&b| b as i8).collect()),
            TagType::Short => Self::Short(raw.chunks_exact(2).map(|c| order.read_u16(c)).collect()),
            TagType::SShort => Self::SShort(raw.chunks_exact(2).map(|c| order.read_i16(c)).collect()),
            TagType::Long => Self::Long(raw.chunks_exact(4).map(|c| order.read_u32(c)).collect()),
            TagType::SLong => Self::SLong(raw.chunks_exact(4).map(|c| order.read_i32(c)).collect()),
            TagType::Float => Self::Float(raw.chunks_exact(4).map(|c| order.read_f32(c)).collect()),
            TagType::Double => Self::Double(raw.chunks_exact(8).map(|c| order.read_f64(c)).collect()),
            TagType::Rational => Self::Rational(
                raw.chunks_exact(8)
                    .map(|c| Rational {
                        num: order.read_u32(&c[..4]),
                        denom: order.read_u32(&c[4..]),
                    })
                    .collect(),
            ),
            TagType::SRational => Self::SRational(
                raw.chunks_exact(8)
                    .map(|c| SRational {
                        num: order.read_i32(&c[..4]),
                        denom: order.read_i32(&c[4..]),
                    })
                    .collect(),
            ),
        }
    }

    pub(crate) fn encode(&self, order: Endian) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        match self {
            Self::Byte(v) | Self::Ascii(v) | Self::Undefined(v) => out.extend_from_slice(v),
            Self::SByte(v) => out.extend(v.iter().map(|&b| b as u8)),
            Self::Short(v) => v.iter().for_each(|&x| order.put_u16(&mut out, x)),
            Self::SShort(v) => v.iter().for_each(|&x| order.put_i16(&mut out, x)),
            Self::Long(v) => v.iter().for_each(|&x| order.put_u32(&mut out, x)),
            Self::SLong(v) => v.iter().for_each(|&x| order.put_i32(&mut out, x)),
            Self::Float(v) => v.iter().for_each(|&x| order.put_f32(&mut out, x)),
            Self::Double(v) => v.iter().for_each(|&x| order.put_f64(&mut out, x)),
            Self::Rational(v) => v.iter().for_each(|r| {
                order.put_u32(&mut out, r.num);
                order.put_u32(&mut out, r.denom);
            }),
            Self::SRational(v) => v.iter().for_each(|r| {
                order.put_i32(&mut out, r.num);
                order.put_i32(&mut out, r.denom);
            }),
        }
        out
    }
}
