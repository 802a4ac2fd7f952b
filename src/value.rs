use std::{fmt, sync::Arc};

use bytes::{Bytes, BytesMut};

use crate::{
    Array, Document, Error, Partial, Result, Tag, ValidateConfig, cold_path,
    size::{payload_len, string_len, validate_payload},
    util::{
        EMPTY_DOCUMENT, cstr_len, encode_i32, len_i32, read_array, read_f64, read_i32, read_i64,
        read_len, read_u32,
    },
};

/// Where the payload of a [`Value`] lives.
///
/// `Raw` means the bytes in the value's buffer are authoritative. The other
/// variants hold a decoded container that supersedes the nested document
/// bytes in the buffer; those bytes are stale and only the framing before
/// them (type byte, key and, for code-with-scope, the code string) is still
/// read from the buffer.
#[derive(Clone, Default)]
pub enum Payload {
    #[default]
    Raw,
    /// Embedded document, or the scope of a code-with-scope value.
    Document(Arc<Document>),
    Array(Arc<Array>),
}

impl Payload {
    #[inline]
    pub fn is_raw(&self) -> bool {
        matches!(self, Payload::Raw)
    }

    /// Copies the materialized container, if any, so that no mutable state
    /// is shared with `self`.
    pub fn deep_copy(&self) -> Self {
        match self {
            Payload::Raw => Payload::Raw,
            Payload::Document(doc) => Payload::Document(Arc::new(doc.copy())),
            Payload::Array(arr) => Payload::Array(Arc::new(arr.copy())),
        }
    }
}

/// A lazy view of one BSON payload.
///
/// The value keeps the offset of its owning element's type byte (`start`) and
/// the offset where the payload begins (`offset`), both into a shared buffer.
/// A default value is uninitialized.
#[derive(Clone, Default)]
pub struct Value {
    pub(crate) data: Bytes,
    pub(crate) start: usize,
    pub(crate) offset: usize,
    pub(crate) payload: Payload,
}

impl Value {
    #[inline]
    pub(crate) fn from_parts(data: Bytes, start: usize, offset: usize) -> Self {
        Self {
            data,
            start,
            offset,
            payload: Payload::Raw,
        }
    }

    /// Builds a standalone `[tag][0x00][payload]` buffer with an empty key.
    fn synthesize(tag: Tag, parts: &[&[u8]], payload: Payload) -> Self {
        let len = parts.iter().map(|part| part.len()).sum::<usize>();
        let mut buf = BytesMut::with_capacity(2 + len);
        buf.extend_from_slice(&[tag as u8, 0]);
        for part in parts {
            buf.extend_from_slice(part);
        }
        Self {
            data: buf.freeze(),
            start: 0,
            offset: 2,
            payload,
        }
    }

    fn string_like(tag: Tag, s: &str) -> Self {
        let len = (s.len() as i32 + 1).to_le_bytes();
        Self::synthesize(tag, &[&len, s.as_bytes(), &[0]], Payload::Raw)
    }

    pub fn double(value: f64) -> Self {
        Self::synthesize(Tag::Double, &[&value.to_le_bytes()], Payload::Raw)
    }

    pub fn string(value: &str) -> Self {
        Self::string_like(Tag::String, value)
    }

    pub fn document(value: Document) -> Self {
        Self::synthesize(
            Tag::EmbeddedDocument,
            &[&EMPTY_DOCUMENT],
            Payload::Document(Arc::new(value)),
        )
    }

    pub fn array(value: Array) -> Self {
        Self::synthesize(Tag::Array, &[&EMPTY_DOCUMENT], Payload::Array(Arc::new(value)))
    }

    pub fn binary(subtype: u8, value: &[u8]) -> Self {
        let len = (value.len() as i32).to_le_bytes();
        Self::synthesize(Tag::Binary, &[&len, &[subtype], value], Payload::Raw)
    }

    pub fn undefined() -> Self {
        Self::synthesize(Tag::Undefined, &[], Payload::Raw)
    }

    pub fn object_id(value: [u8; 12]) -> Self {
        Self::synthesize(Tag::ObjectId, &[&value], Payload::Raw)
    }

    pub fn boolean(value: bool) -> Self {
        Self::synthesize(Tag::Boolean, &[&[value as u8]], Payload::Raw)
    }

    /// Milliseconds since the Unix epoch.
    pub fn date_time(value: i64) -> Self {
        Self::synthesize(Tag::DateTime, &[&value.to_le_bytes()], Payload::Raw)
    }

    pub fn null() -> Self {
        Self::synthesize(Tag::Null, &[], Payload::Raw)
    }

    pub fn regex(pattern: &str, options: &str) -> Self {
        Self::synthesize(
            Tag::Regex,
            &[pattern.as_bytes(), &[0], options.as_bytes(), &[0]],
            Payload::Raw,
        )
    }

    pub fn db_pointer(namespace: &str, id: [u8; 12]) -> Self {
        let len = (namespace.len() as i32 + 1).to_le_bytes();
        Self::synthesize(
            Tag::DbPointer,
            &[&len, namespace.as_bytes(), &[0], &id],
            Payload::Raw,
        )
    }

    pub fn javascript(code: &str) -> Self {
        Self::string_like(Tag::JavaScript, code)
    }

    pub fn symbol(value: &str) -> Self {
        Self::string_like(Tag::Symbol, value)
    }

    /// The scope is held materialized; the framing bytes describe an empty
    /// scope until the value is written.
    pub fn code_with_scope(code: &str, scope: Document) -> Self {
        let code_len = code.len() + 1;
        let total = (4 + 4 + code_len + EMPTY_DOCUMENT.len()) as i32;
        Self::synthesize(
            Tag::CodeWithScope,
            &[
                &total.to_le_bytes(),
                &(code_len as i32).to_le_bytes(),
                code.as_bytes(),
                &[0],
                &EMPTY_DOCUMENT,
            ],
            Payload::Document(Arc::new(scope)),
        )
    }

    pub fn int32(value: i32) -> Self {
        Self::synthesize(Tag::Int32, &[&value.to_le_bytes()], Payload::Raw)
    }

    /// `increment` occupies the low four bytes, `time` the high four.
    pub fn timestamp(time: u32, increment: u32) -> Self {
        Self::synthesize(
            Tag::Timestamp,
            &[&increment.to_le_bytes(), &time.to_le_bytes()],
            Payload::Raw,
        )
    }

    pub fn int64(value: i64) -> Self {
        Self::synthesize(Tag::Int64, &[&value.to_le_bytes()], Payload::Raw)
    }

    pub fn decimal128(value: [u8; 16]) -> Self {
        Self::synthesize(Tag::Decimal128, &[&value], Payload::Raw)
    }

    pub fn min_key() -> Self {
        Self::synthesize(Tag::MinKey, &[], Payload::Raw)
    }

    pub fn max_key() -> Self {
        Self::synthesize(Tag::MaxKey, &[], Payload::Raw)
    }
}

impl Value {
    #[inline]
    pub fn is_initialized(&self) -> bool {
        !self.data.is_empty()
            && self.offset != 0
            && self.start < self.offset
            && self.offset <= self.data.len()
    }

    /// The type byte of the owning element, read from the buffer even when
    /// the payload is materialized.
    #[inline]
    pub fn tag(&self) -> Result<Tag> {
        if !self.is_initialized() {
            cold_path();
            return Err(Error::UninitializedValue);
        }
        Tag::try_from(self.data[self.start])
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The bytes this value was parsed from, shared with its siblings.
    #[inline]
    pub fn buffer(&self) -> &Bytes {
        &self.data
    }

    #[inline]
    fn check_tag(&self, expected: Tag) -> Result<()> {
        let actual = self.tag()?;
        if actual != expected {
            cold_path();
            return Err(Error::TypeMismatch { expected, actual });
        }
        Ok(())
    }

    /// Validates the payload and returns its encoded length.
    #[inline]
    pub fn validate(&self) -> std::result::Result<usize, Partial> {
        self.validate_with(&ValidateConfig::default())
    }

    #[inline]
    pub fn validate_with(&self, config: &ValidateConfig) -> std::result::Result<usize, Partial> {
        self.validate_at(0, config)
    }

    pub(crate) fn validate_at(
        &self,
        depth: u32,
        config: &ValidateConfig,
    ) -> std::result::Result<usize, Partial> {
        let tag = self.tag()?;
        match (tag, &self.payload) {
            (_, Payload::Raw) => validate_payload(tag, &self.data, self.offset, depth, config),
            (Tag::EmbeddedDocument, Payload::Document(doc)) => doc.validate_at(depth + 1, config),
            (Tag::Array, Payload::Array(arr)) => arr.validate_at(depth + 1, config),
            (Tag::CodeWithScope, Payload::Document(scope)) => {
                let code = string_len(&self.data, self.offset + 4)
                    .map_err(|e| Partial::new(4, e))?;
                let scope = scope
                    .validate_at(depth + 1, config)
                    .map_err(|p| p.after(4 + code))?;
                Ok(4 + code + scope)
            }
            (actual, Payload::Document(_)) => Err(Error::TypeMismatch {
                expected: Tag::EmbeddedDocument,
                actual,
            }
            .into()),
            (actual, Payload::Array(_)) => Err(Error::TypeMismatch {
                expected: Tag::Array,
                actual,
            }
            .into()),
        }
    }

    /// The raw payload bytes, framing included.
    ///
    /// For a materialized container these are the stale bytes it superseded.
    pub fn raw_payload(&self) -> Result<&[u8]> {
        let tag = self.tag()?;
        let len = payload_len(tag, &self.data, self.offset)?;
        Ok(&self.data[self.offset..self.offset + len])
    }

    /// Code string length (terminator included) of a code-with-scope payload.
    #[inline]
    fn code_len(&self) -> Result<usize> {
        read_len(&self.data, self.offset + 4)
    }

    /// Reads a string payload at `at` without its terminator.
    fn str_at(&self, at: usize) -> Result<&str> {
        let len = string_len(&self.data, at)? - 4;
        std::str::from_utf8(&self.data[at + 4..at + 4 + len - 1]).map_err(|_| Error::InvalidUtf8)
    }

    fn cstr_at(&self, at: usize) -> Result<(&str, usize)> {
        let len = cstr_len(&self.data, at, self.data.len())?;
        let s = std::str::from_utf8(&self.data[at..at + len]).map_err(|_| Error::InvalidUtf8)?;
        Ok((s, len + 1))
    }
}

impl Value {
    pub fn as_f64(&self) -> Result<f64> {
        self.check_tag(Tag::Double)?;
        read_f64(&self.data, self.offset)
    }

    pub fn as_str(&self) -> Result<&str> {
        self.check_tag(Tag::String)?;
        self.str_at(self.offset)
    }

    /// The embedded document, decoded lazily unless already materialized.
    pub fn as_document(&self) -> Result<Document> {
        self.check_tag(Tag::EmbeddedDocument)?;
        match &self.payload {
            Payload::Document(doc) => Ok(Document::clone(doc)),
            _ => Document::read_at(self.data.clone(), self.offset),
        }
    }

    pub fn as_array(&self) -> Result<Array> {
        self.check_tag(Tag::Array)?;
        match &self.payload {
            Payload::Array(arr) => Ok(Array::clone(arr)),
            _ => Array::read_at(self.data.clone(), self.offset),
        }
    }

    /// Subtype and data of a binary payload.
    pub fn as_binary(&self) -> Result<(u8, &[u8])> {
        self.check_tag(Tag::Binary)?;
        let len = payload_len(Tag::Binary, &self.data, self.offset)? - 5;
        let subtype = self.data[self.offset + 4];
        Ok((subtype, &self.data[self.offset + 5..self.offset + 5 + len]))
    }

    pub fn as_object_id(&self) -> Result<[u8; 12]> {
        self.check_tag(Tag::ObjectId)?;
        read_array(&self.data, self.offset)
    }

    pub fn as_bool(&self) -> Result<bool> {
        self.check_tag(Tag::Boolean)?;
        match self.data.get(self.offset) {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(&other) => Err(Error::InvalidBoolean(other)),
            None => Err(Error::EndOfFile),
        }
    }

    pub fn as_date_time(&self) -> Result<i64> {
        self.check_tag(Tag::DateTime)?;
        read_i64(&self.data, self.offset)
    }

    /// Pattern and options of a regular expression.
    pub fn as_regex(&self) -> Result<(&str, &str)> {
        self.check_tag(Tag::Regex)?;
        let (pattern, advance) = self.cstr_at(self.offset)?;
        let (options, _) = self.cstr_at(self.offset + advance)?;
        Ok((pattern, options))
    }

    pub fn as_db_pointer(&self) -> Result<(&str, [u8; 12])> {
        self.check_tag(Tag::DbPointer)?;
        let namespace = self.str_at(self.offset)?;
        let id = read_array(&self.data, self.offset + 4 + namespace.len() + 1)?;
        Ok((namespace, id))
    }

    pub fn as_javascript(&self) -> Result<&str> {
        self.check_tag(Tag::JavaScript)?;
        self.str_at(self.offset)
    }

    pub fn as_symbol(&self) -> Result<&str> {
        self.check_tag(Tag::Symbol)?;
        self.str_at(self.offset)
    }

    /// Code string and scope document.
    pub fn as_code_with_scope(&self) -> Result<(&str, Document)> {
        self.check_tag(Tag::CodeWithScope)?;
        let code = self.str_at(self.offset + 4)?;
        let scope = match &self.payload {
            Payload::Document(doc) => Document::clone(doc),
            _ => Document::read_at(self.data.clone(), self.offset + 4 + 4 + self.code_len()?)?,
        };
        Ok((code, scope))
    }

    pub fn as_i32(&self) -> Result<i32> {
        self.check_tag(Tag::Int32)?;
        read_i32(&self.data, self.offset)
    }

    /// `(time, increment)` of a timestamp.
    pub fn as_timestamp(&self) -> Result<(u32, u32)> {
        self.check_tag(Tag::Timestamp)?;
        let increment = read_u32(&self.data, self.offset)?;
        let time = read_u32(&self.data, self.offset + 4)?;
        Ok((time, increment))
    }

    pub fn as_i64(&self) -> Result<i64> {
        self.check_tag(Tag::Int64)?;
        read_i64(&self.data, self.offset)
    }

    pub fn as_decimal128(&self) -> Result<[u8; 16]> {
        self.check_tag(Tag::Decimal128)?;
        read_array(&self.data, self.offset)
    }
}

impl Value {
    /// Decodes a raw container payload into an owned override.
    fn materialize(&mut self) -> Result<()> {
        if !self.payload.is_raw() {
            return Ok(());
        }
        let tag = self.tag()?;
        self.payload = match tag {
            Tag::EmbeddedDocument => {
                Payload::Document(Arc::new(Document::read_at(self.data.clone(), self.offset)?))
            }
            Tag::Array => Payload::Array(Arc::new(Array::read_at(self.data.clone(), self.offset)?)),
            Tag::CodeWithScope => {
                let scope_at = self.offset + 4 + 4 + self.code_len()?;
                Payload::Document(Arc::new(Document::read_at(self.data.clone(), scope_at)?))
            }
            other => {
                cold_path();
                return Err(Error::TypeMismatch {
                    expected: Tag::EmbeddedDocument,
                    actual: other,
                });
            }
        };
        log::debug!(
            "materialized {} payload at offset {}",
            tag.name(),
            self.offset
        );
        Ok(())
    }

    /// Mutable access to an embedded document.
    ///
    /// The first call decodes the raw bytes into an override; from then on
    /// the override is what gets written. A shared override is copied first.
    pub fn document_mut(&mut self) -> Result<&mut Document> {
        self.check_tag(Tag::EmbeddedDocument)?;
        self.materialize()?;
        match &mut self.payload {
            Payload::Document(doc) => Ok(Arc::make_mut(doc)),
            _ => Err(Error::UninitializedValue),
        }
    }

    pub fn array_mut(&mut self) -> Result<&mut Array> {
        self.check_tag(Tag::Array)?;
        self.materialize()?;
        match &mut self.payload {
            Payload::Array(arr) => Ok(Arc::make_mut(arr)),
            _ => Err(Error::UninitializedValue),
        }
    }

    /// Mutable access to the scope of a code-with-scope value.
    pub fn scope_mut(&mut self) -> Result<&mut Document> {
        self.check_tag(Tag::CodeWithScope)?;
        self.materialize()?;
        match &mut self.payload {
            Payload::Document(doc) => Ok(Arc::make_mut(doc)),
            _ => Err(Error::UninitializedValue),
        }
    }

    /// Outer length a code-with-scope payload should declare, from its parts.
    pub(crate) fn code_with_scope_len(&self) -> Result<usize> {
        let prefix = 4 + 4 + self.code_len()?;
        let scope = match &self.payload {
            Payload::Document(doc) => doc.validate()?,
            _ => read_len(&self.data, self.offset + prefix)?,
        };
        Ok(prefix + scope)
    }

    /// Rewrites the outer length of a code-with-scope payload in this
    /// value's buffer so that it matches the code string and scope.
    ///
    /// This mutates the buffer. A buffer shared with other values is copied
    /// first, so siblings keep seeing the bytes they were parsed from.
    /// Returns whether a correction was made.
    pub fn normalize_header(&mut self) -> Result<bool> {
        if self.tag()? != Tag::CodeWithScope {
            return Ok(false);
        }
        let total = len_i32(self.code_with_scope_len()?)?;
        let declared = read_i32(&self.data, self.offset)?;
        if declared == total {
            return Ok(false);
        }

        let mut buf = match std::mem::take(&mut self.data).try_into_mut() {
            Ok(unique) => unique,
            Err(shared) => BytesMut::from(&shared[..]),
        };
        let patched = encode_i32(&mut buf, self.offset, total);
        self.data = buf.freeze();
        patched?;
        log::debug!(
            "code-with-scope length at offset {} corrected from {declared} to {total}",
            self.offset
        );
        Ok(true)
    }

    /// A copy whose materialized payload is independent of `self`.
    pub fn deep_copy(&self) -> Self {
        Self {
            data: self.data.clone(),
            start: self.start,
            offset: self.offset,
            payload: self.payload.deep_copy(),
        }
    }

    /// Structural equality: same type and same payload, containers compared
    /// element by element in order.
    pub fn equal(&self, other: &Value) -> bool {
        match (self.is_initialized(), other.is_initialized()) {
            (false, false) => return true,
            (true, true) => {}
            _ => return false,
        }
        let (Ok(tag), Ok(other_tag)) = (self.tag(), other.tag()) else {
            return false;
        };
        if tag != other_tag {
            return false;
        }
        match tag {
            Tag::EmbeddedDocument => match (self.as_document(), other.as_document()) {
                (Ok(a), Ok(b)) => a.equal(&b),
                _ => false,
            },
            Tag::Array => match (self.as_array(), other.as_array()) {
                (Ok(a), Ok(b)) => a.equal(&b),
                _ => false,
            },
            Tag::CodeWithScope => match (self.as_code_with_scope(), other.as_code_with_scope()) {
                (Ok((code_a, scope_a)), Ok((code_b, scope_b))) => {
                    code_a == code_b && scope_a.equal(&scope_b)
                }
                _ => false,
            },
            _ => match (self.raw_payload(), other.raw_payload()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl PartialEq for Value {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(tag) = self.tag() else {
            return f.write_str("<uninitialized>");
        };
        let rendered = match tag {
            Tag::Double => self.as_f64().map(|v| write!(f, "{v}")),
            Tag::String => self.as_str().map(|v| write!(f, "{v:?}")),
            Tag::EmbeddedDocument => self.as_document().map(|v| write!(f, "{v}")),
            Tag::Array => self.as_array().map(|v| write!(f, "{v}")),
            Tag::Binary => self
                .as_binary()
                .map(|(subtype, data)| write!(f, "Binary({subtype:#04x}, {data:?})")),
            Tag::Undefined => Ok(f.write_str("undefined")),
            Tag::ObjectId => self.as_object_id().map(|id| {
                f.write_str("ObjectID(\"")?;
                for byte in id {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("\")")
            }),
            Tag::Boolean => self.as_bool().map(|v| write!(f, "{v}")),
            Tag::DateTime => self.as_date_time().map(|v| write!(f, "DateTime({v})")),
            Tag::Null => Ok(f.write_str("null")),
            Tag::Regex => self
                .as_regex()
                .map(|(pattern, options)| write!(f, "/{pattern}/{options}")),
            Tag::DbPointer => self
                .as_db_pointer()
                .map(|(namespace, _)| write!(f, "DBPointer({namespace:?})")),
            Tag::JavaScript => self.as_javascript().map(|v| write!(f, "JavaScript({v:?})")),
            Tag::Symbol => self.as_symbol().map(|v| write!(f, "Symbol({v:?})")),
            Tag::CodeWithScope => self
                .as_code_with_scope()
                .map(|(code, scope)| write!(f, "CodeWithScope({code:?}, {scope})")),
            Tag::Int32 => self.as_i32().map(|v| write!(f, "{v}")),
            Tag::Timestamp => self
                .as_timestamp()
                .map(|(time, increment)| write!(f, "Timestamp({time}, {increment})")),
            Tag::Int64 => self.as_i64().map(|v| write!(f, "{v}")),
            Tag::Decimal128 => self.as_decimal128().map(|v| write!(f, "Decimal128({v:?})")),
            Tag::MinKey => Ok(f.write_str("MinKey")),
            Tag::MaxKey => Ok(f.write_str("MaxKey")),
        };
        rendered.unwrap_or_else(|_| f.write_str("<invalid>"))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Ok(tag) => write!(f, "Value[{tag}]({self})"),
            Err(_) => f.write_str("Value(<uninitialized>)"),
        }
    }
}
