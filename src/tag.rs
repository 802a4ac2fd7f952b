use std::fmt;

use crate::Error;

/// The type byte that precedes every element key.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Tag {
    Double = 0x01,
    String = 0x02,
    EmbeddedDocument = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Undefined = 0x06,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    Regex = 0x0B,
    DbPointer = 0x0C,
    JavaScript = 0x0D,
    Symbol = 0x0E,
    CodeWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    Decimal128 = 0x13,
    MaxKey = 0x7F,
    MinKey = 0xFF,
}

impl TryFrom<u8> for Tag {
    type Error = Error;

    #[inline]
    fn try_from(value: u8) -> Result<Self, Error> {
        Ok(match value {
            0x01 => Tag::Double,
            0x02 => Tag::String,
            0x03 => Tag::EmbeddedDocument,
            0x04 => Tag::Array,
            0x05 => Tag::Binary,
            0x06 => Tag::Undefined,
            0x07 => Tag::ObjectId,
            0x08 => Tag::Boolean,
            0x09 => Tag::DateTime,
            0x0A => Tag::Null,
            0x0B => Tag::Regex,
            0x0C => Tag::DbPointer,
            0x0D => Tag::JavaScript,
            0x0E => Tag::Symbol,
            0x0F => Tag::CodeWithScope,
            0x10 => Tag::Int32,
            0x11 => Tag::Timestamp,
            0x12 => Tag::Int64,
            0x13 => Tag::Decimal128,
            0x7F => Tag::MaxKey,
            0xFF => Tag::MinKey,
            other => return Err(Error::InvalidTag(other)),
        })
    }
}

impl Tag {
    /// Payload width of fixed-size types, `None` for length-prefixed ones.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Undefined | Self::Null | Self::MinKey | Self::MaxKey => Some(0),
            Self::Boolean => Some(1),
            Self::Int32 => Some(4),
            Self::Double | Self::DateTime | Self::Timestamp | Self::Int64 => Some(8),
            Self::ObjectId => Some(12),
            Self::Decimal128 => Some(16),
            _ => None,
        }
    }

    pub const fn is_container(self) -> bool {
        matches!(self, Self::EmbeddedDocument | Self::Array)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::String => "string",
            Self::EmbeddedDocument => "embedded document",
            Self::Array => "array",
            Self::Binary => "binary",
            Self::Undefined => "undefined",
            Self::ObjectId => "objectID",
            Self::Boolean => "boolean",
            Self::DateTime => "UTC datetime",
            Self::Null => "null",
            Self::Regex => "regex",
            Self::DbPointer => "dbPointer",
            Self::JavaScript => "javascript",
            Self::Symbol => "symbol",
            Self::CodeWithScope => "code with scope",
            Self::Int32 => "32-bit integer",
            Self::Timestamp => "timestamp",
            Self::Int64 => "64-bit integer",
            Self::Decimal128 => "128-bit decimal",
            Self::MaxKey => "max key",
            Self::MinKey => "min key",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
