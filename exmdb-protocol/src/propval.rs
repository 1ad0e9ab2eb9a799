//! Tagged property values.
//!
//! A property tag is a 32-bit identifier whose low 16 bits encode the wire
//! type and whose high 16 bits encode the property id. The special type code
//! [`proptype::UNSPECIFIED`] means the real type is carried as an extra
//! 16-bit field on the wire instead of inside the tag.

use crate::buffer::IoBuffer;
use crate::error::ProtocolError;
use crate::util;
use std::borrow::Cow;
use std::fmt;

/// Wire type codes and tag classification helpers.
pub mod proptype {
    pub const UNSPECIFIED: u16 = 0x0000;
    pub const SHORT: u16 = 0x0002;
    pub const LONG: u16 = 0x0003;
    pub const FLOAT: u16 = 0x0004;
    pub const DOUBLE: u16 = 0x0005;
    pub const CURRENCY: u16 = 0x0006;
    pub const FLOATINGTIME: u16 = 0x0007;
    pub const ERROR: u16 = 0x000a;
    pub const BYTE: u16 = 0x000b;
    pub const LONGLONG: u16 = 0x0014;
    pub const STRING: u16 = 0x001e;
    pub const WSTRING: u16 = 0x001f;
    pub const FILETIME: u16 = 0x0040;
    pub const BINARY: u16 = 0x0102;
    pub const SHORT_ARRAY: u16 = 0x1002;
    pub const LONG_ARRAY: u16 = 0x1003;
    pub const FLOAT_ARRAY: u16 = 0x1004;
    pub const DOUBLE_ARRAY: u16 = 0x1005;
    pub const CURRENCY_ARRAY: u16 = 0x1006;
    pub const FLOATINGTIME_ARRAY: u16 = 0x1007;
    pub const LONGLONG_ARRAY: u16 = 0x1014;
    pub const STRING_ARRAY: u16 = 0x101e;
    pub const WSTRING_ARRAY: u16 = 0x101f;
    pub const BINARY_ARRAY: u16 = 0x1102;

    /// Type code embedded in a property tag.
    pub const fn tag_type(tag: u32) -> u16 {
        (tag & 0xffff) as u16
    }

    /// Property id part of a tag.
    pub const fn tag_id(tag: u32) -> u16 {
        (tag >> 16) as u16
    }

    /// Whether the type stores multiple values (including raw binary).
    pub const fn is_array(ptype: u16) -> bool {
        ptype & 0x1000 != 0 || ptype == BINARY
    }

    /// Name of a type code, for diagnostics.
    pub const fn name(ptype: u16) -> &'static str {
        match ptype {
            BYTE => "BYTE",
            SHORT => "SHORT",
            LONG => "LONG",
            ERROR => "ERROR",
            LONGLONG => "LONGLONG",
            CURRENCY => "CURRENCY",
            FILETIME => "FILETIME",
            FLOAT => "FLOAT",
            DOUBLE => "DOUBLE",
            FLOATINGTIME => "FLOATINGTIME",
            STRING => "STRING",
            WSTRING => "WSTRING",
            BINARY => "BINARY",
            SHORT_ARRAY => "SHORT ARRAY",
            LONG_ARRAY => "LONG ARRAY",
            LONGLONG_ARRAY => "LONGLONG ARRAY",
            CURRENCY_ARRAY => "CURRENCY ARRAY",
            FLOAT_ARRAY => "FLOAT ARRAY",
            DOUBLE_ARRAY => "DOUBLE ARRAY",
            FLOATINGTIME_ARRAY => "FLOATINGTIME ARRAY",
            STRING_ARRAY => "STRING ARRAY",
            WSTRING_ARRAY => "WSTRING ARRAY",
            BINARY_ARRAY => "BINARY ARRAY",
            _ => "UNKNOWN",
        }
    }
}

/// Value carried by a [`TaggedPropval`].
///
/// Variants are keyed by in-memory representation; the exact wire type
/// (e.g. LONGLONG vs CURRENCY vs FILETIME, all 64-bit) lives in the
/// propval's type code.
#[derive(Debug, Clone, PartialEq)]
pub enum PropvalValue<'a> {
    Byte(u8),
    Short(u16),
    Long(u32),
    LongLong(u64),
    Float(f32),
    Double(f64),
    String(Cow<'a, str>),
    Binary(Cow<'a, [u8]>),
    ShortArray(Vec<u16>),
    LongArray(Vec<u32>),
    LongLongArray(Vec<u64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<String>),
    BinaryArray(Vec<Vec<u8>>),
}

impl PropvalValue<'_> {
    fn kind(&self) -> &'static str {
        match self {
            PropvalValue::Byte(_) => "an 8-bit value",
            PropvalValue::Short(_) => "a 16-bit value",
            PropvalValue::Long(_) => "a 32-bit value",
            PropvalValue::LongLong(_) => "a 64-bit value",
            PropvalValue::Float(_) => "a 32-bit float",
            PropvalValue::Double(_) => "a 64-bit float",
            PropvalValue::String(_) => "a string",
            PropvalValue::Binary(_) => "binary data",
            PropvalValue::ShortArray(_) => "a 16-bit array",
            PropvalValue::LongArray(_) => "a 32-bit array",
            PropvalValue::LongLongArray(_) => "a 64-bit array",
            PropvalValue::FloatArray(_) => "a 32-bit float array",
            PropvalValue::DoubleArray(_) => "a 64-bit float array",
            PropvalValue::StringArray(_) => "a string array",
            PropvalValue::BinaryArray(_) => "a binary array",
        }
    }

    fn into_owned(self) -> PropvalValue<'static> {
        match self {
            PropvalValue::Byte(v) => PropvalValue::Byte(v),
            PropvalValue::Short(v) => PropvalValue::Short(v),
            PropvalValue::Long(v) => PropvalValue::Long(v),
            PropvalValue::LongLong(v) => PropvalValue::LongLong(v),
            PropvalValue::Float(v) => PropvalValue::Float(v),
            PropvalValue::Double(v) => PropvalValue::Double(v),
            PropvalValue::String(v) => PropvalValue::String(Cow::Owned(v.into_owned())),
            PropvalValue::Binary(v) => PropvalValue::Binary(Cow::Owned(v.into_owned())),
            PropvalValue::ShortArray(v) => PropvalValue::ShortArray(v),
            PropvalValue::LongArray(v) => PropvalValue::LongArray(v),
            PropvalValue::LongLongArray(v) => PropvalValue::LongLongArray(v),
            PropvalValue::FloatArray(v) => PropvalValue::FloatArray(v),
            PropvalValue::DoubleArray(v) => PropvalValue::DoubleArray(v),
            PropvalValue::StringArray(v) => PropvalValue::StringArray(v),
            PropvalValue::BinaryArray(v) => PropvalValue::BinaryArray(v),
        }
    }
}

/// A property value together with its 32-bit tag.
///
/// Strings and binary blobs either borrow from the caller (cheap, the caller
/// must outlive the propval) or own their storage; deserialized propvals
/// always own. [`into_owned`](Self::into_owned) lifts a borrowing propval to
/// `'static`.
///
/// Construction goes through the typed constructors, which reject tags whose
/// declared type does not match the value.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedPropval<'a> {
    tag: u32,
    ptype: u16,
    value: PropvalValue<'a>,
}

impl<'a> TaggedPropval<'a> {
    fn checked(tag: u32, allowed: &[u16], value: PropvalValue<'a>) -> Result<Self, ProtocolError> {
        let ptype = proptype::tag_type(tag);
        if !allowed.contains(&ptype) {
            return Err(ProtocolError::InvalidType {
                tag: proptype::name(ptype),
                value: value.kind(),
            });
        }
        Ok(Self { tag, ptype, value })
    }

    pub fn byte(tag: u32, value: u8) -> Result<Self, ProtocolError> {
        Self::checked(tag, &[proptype::BYTE], PropvalValue::Byte(value))
    }

    pub fn short(tag: u32, value: u16) -> Result<Self, ProtocolError> {
        Self::checked(tag, &[proptype::SHORT], PropvalValue::Short(value))
    }

    pub fn long(tag: u32, value: u32) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::LONG, proptype::ERROR],
            PropvalValue::Long(value),
        )
    }

    pub fn longlong(tag: u32, value: u64) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::LONGLONG, proptype::CURRENCY, proptype::FILETIME],
            PropvalValue::LongLong(value),
        )
    }

    pub fn float(tag: u32, value: f32) -> Result<Self, ProtocolError> {
        Self::checked(tag, &[proptype::FLOAT], PropvalValue::Float(value))
    }

    pub fn double(tag: u32, value: f64) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::DOUBLE, proptype::FLOATINGTIME],
            PropvalValue::Double(value),
        )
    }

    /// String propval; pass a `&str` to borrow or a `String` to own.
    pub fn string(tag: u32, value: impl Into<Cow<'a, str>>) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::STRING, proptype::WSTRING],
            PropvalValue::String(value.into()),
        )
    }

    /// Binary propval; pass a `&[u8]` to borrow or a `Vec<u8>` to own.
    pub fn binary(tag: u32, value: impl Into<Cow<'a, [u8]>>) -> Result<Self, ProtocolError> {
        Self::checked(tag, &[proptype::BINARY], PropvalValue::Binary(value.into()))
    }

    pub fn short_array(tag: u32, value: Vec<u16>) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::SHORT_ARRAY],
            PropvalValue::ShortArray(value),
        )
    }

    pub fn long_array(tag: u32, value: Vec<u32>) -> Result<Self, ProtocolError> {
        Self::checked(tag, &[proptype::LONG_ARRAY], PropvalValue::LongArray(value))
    }

    pub fn longlong_array(tag: u32, value: Vec<u64>) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::LONGLONG_ARRAY, proptype::CURRENCY_ARRAY],
            PropvalValue::LongLongArray(value),
        )
    }

    pub fn float_array(tag: u32, value: Vec<f32>) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::FLOAT_ARRAY],
            PropvalValue::FloatArray(value),
        )
    }

    pub fn double_array(tag: u32, value: Vec<f64>) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::DOUBLE_ARRAY, proptype::FLOATINGTIME_ARRAY],
            PropvalValue::DoubleArray(value),
        )
    }

    pub fn string_array(tag: u32, value: Vec<String>) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::STRING_ARRAY, proptype::WSTRING_ARRAY],
            PropvalValue::StringArray(value),
        )
    }

    pub fn binary_array(tag: u32, value: Vec<Vec<u8>>) -> Result<Self, ProtocolError> {
        Self::checked(
            tag,
            &[proptype::BINARY_ARRAY],
            PropvalValue::BinaryArray(value),
        )
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Effective type code (from the tag, or explicit for UNSPECIFIED tags).
    pub fn prop_type(&self) -> u16 {
        self.ptype
    }

    pub fn value(&self) -> &PropvalValue<'a> {
        &self.value
    }

    /// Copies any borrowed storage, detaching the propval from its source.
    pub fn into_owned(self) -> TaggedPropval<'static> {
        TaggedPropval {
            tag: self.tag,
            ptype: self.ptype,
            value: self.value.into_owned(),
        }
    }

    /// Element count for arrays, byte count for binary, 1 for scalars.
    pub fn count(&self) -> usize {
        match &self.value {
            PropvalValue::Binary(v) => v.len(),
            PropvalValue::ShortArray(v) => v.len(),
            PropvalValue::LongArray(v) => v.len(),
            PropvalValue::LongLongArray(v) => v.len(),
            PropvalValue::FloatArray(v) => v.len(),
            PropvalValue::DoubleArray(v) => v.len(),
            PropvalValue::StringArray(v) => v.len(),
            PropvalValue::BinaryArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self.value {
            PropvalValue::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self.value {
            PropvalValue::LongLong(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropvalValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match &self.value {
            PropvalValue::Binary(v) => Some(v),
            _ => None,
        }
    }

    // =========================================================================
    // Wire format
    // =========================================================================

    /// Serializes the tag (plus explicit type for UNSPECIFIED tags) and the
    /// value.
    pub fn serialize(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_u32(self.tag);
        if proptype::tag_type(self.tag) == proptype::UNSPECIFIED {
            buf.push_u16(self.ptype);
        }
        match &self.value {
            PropvalValue::Byte(v) => buf.push_u8(*v),
            PropvalValue::Short(v) => buf.push_u16(*v),
            PropvalValue::Long(v) => buf.push_u32(*v),
            PropvalValue::LongLong(v) => buf.push_u64(*v),
            PropvalValue::Float(v) => buf.push_f32(*v),
            PropvalValue::Double(v) => buf.push_f64(*v),
            PropvalValue::String(v) => buf.push_str(v),
            PropvalValue::Binary(v) => {
                buf.push_u32(v.len() as u32);
                buf.push_raw(v);
            }
            PropvalValue::ShortArray(v) => {
                buf.push_u32(v.len() as u32);
                v.iter().for_each(|e| buf.push_u16(*e));
            }
            PropvalValue::LongArray(v) => {
                buf.push_u32(v.len() as u32);
                v.iter().for_each(|e| buf.push_u32(*e));
            }
            PropvalValue::LongLongArray(v) => {
                buf.push_u32(v.len() as u32);
                v.iter().for_each(|e| buf.push_u64(*e));
            }
            PropvalValue::FloatArray(v) => {
                buf.push_u32(v.len() as u32);
                v.iter().for_each(|e| buf.push_f32(*e));
            }
            PropvalValue::DoubleArray(v) => {
                buf.push_u32(v.len() as u32);
                v.iter().for_each(|e| buf.push_f64(*e));
            }
            PropvalValue::StringArray(v) => {
                buf.push_u32(v.len() as u32);
                v.iter().for_each(|e| buf.push_str(e));
            }
            PropvalValue::BinaryArray(v) => {
                buf.push_u32(v.len() as u32);
                for e in v {
                    buf.push_u32(e.len() as u32);
                    buf.push_raw(e);
                }
            }
        }
        Ok(())
    }

    /// Reads a propval from the buffer. The result always owns its storage.
    pub fn deserialize(buf: &mut IoBuffer) -> Result<TaggedPropval<'static>, ProtocolError> {
        let tag = buf.pop_u32()?;
        let ptype = if proptype::tag_type(tag) == proptype::UNSPECIFIED {
            buf.pop_u16()?
        } else {
            proptype::tag_type(tag)
        };
        let value = match ptype {
            proptype::BYTE => PropvalValue::Byte(buf.pop_u8()?),
            proptype::SHORT => PropvalValue::Short(buf.pop_u16()?),
            proptype::LONG | proptype::ERROR => PropvalValue::Long(buf.pop_u32()?),
            proptype::LONGLONG | proptype::CURRENCY | proptype::FILETIME => {
                PropvalValue::LongLong(buf.pop_u64()?)
            }
            proptype::FLOAT => PropvalValue::Float(buf.pop_f32()?),
            proptype::DOUBLE | proptype::FLOATINGTIME => PropvalValue::Double(buf.pop_f64()?),
            proptype::STRING | proptype::WSTRING => {
                PropvalValue::String(Cow::Owned(buf.pop_string()?))
            }
            proptype::BINARY => {
                let len = buf.pop_u32()? as usize;
                PropvalValue::Binary(Cow::Owned(buf.pop_raw(len)?.to_vec()))
            }
            proptype::SHORT_ARRAY => {
                let count = buf.pop_u32()?;
                let mut v = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    v.push(buf.pop_u16()?);
                }
                PropvalValue::ShortArray(v)
            }
            proptype::LONG_ARRAY => {
                let count = buf.pop_u32()?;
                let mut v = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    v.push(buf.pop_u32()?);
                }
                PropvalValue::LongArray(v)
            }
            proptype::LONGLONG_ARRAY | proptype::CURRENCY_ARRAY => {
                let count = buf.pop_u32()?;
                let mut v = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    v.push(buf.pop_u64()?);
                }
                PropvalValue::LongLongArray(v)
            }
            proptype::FLOAT_ARRAY => {
                let count = buf.pop_u32()?;
                let mut v = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    v.push(buf.pop_f32()?);
                }
                PropvalValue::FloatArray(v)
            }
            proptype::DOUBLE_ARRAY | proptype::FLOATINGTIME_ARRAY => {
                let count = buf.pop_u32()?;
                let mut v = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    v.push(buf.pop_f64()?);
                }
                PropvalValue::DoubleArray(v)
            }
            proptype::STRING_ARRAY | proptype::WSTRING_ARRAY => {
                let count = buf.pop_u32()?;
                let mut v = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    v.push(buf.pop_string()?);
                }
                PropvalValue::StringArray(v)
            }
            proptype::BINARY_ARRAY => {
                let count = buf.pop_u32()?;
                let mut v = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let len = buf.pop_u32()? as usize;
                    v.push(buf.pop_raw(len)?.to_vec());
                }
                PropvalValue::BinaryArray(v)
            }
            other => return Err(ProtocolError::UnsupportedType(other)),
        };
        Ok(TaggedPropval { tag, ptype, value })
    }
}

impl fmt::Display for TaggedPropval<'_> {
    /// Renders the contained value; FILETIME values are shown as UTC
    /// datetimes, blobs and arrays by their size.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ptype == proptype::FILETIME {
            if let PropvalValue::LongLong(v) = self.value {
                if let Some(dt) = util::nt_to_datetime(v) {
                    return write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC"));
                }
            }
        }
        match &self.value {
            PropvalValue::Byte(v) => write!(f, "{v}"),
            PropvalValue::Short(v) => write!(f, "{v}"),
            PropvalValue::Long(v) => write!(f, "{v}"),
            PropvalValue::LongLong(v) => write!(f, "{v}"),
            PropvalValue::Float(v) => write!(f, "{v}"),
            PropvalValue::Double(v) => write!(f, "{v}"),
            PropvalValue::String(v) => write!(f, "{v}"),
            PropvalValue::Binary(v) => write!(f, "[{} bytes]", v.len()),
            _ => write!(f, "[{} elements]", self.count()),
        }
    }
}
