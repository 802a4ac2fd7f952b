use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::{
    Error, Partial, Payload, Result, Tag, ValidateConfig, Value, cold_path, size::payload_len,
    util::cstr_len,
};

/// One key/value pair of a BSON document.
///
/// The key is not stored separately: it is the span between the type byte and
/// the start of the payload in the value's buffer, minus the null terminator.
/// Cloning is shallow; the buffer and any materialized payload are shared.
/// Use [`Element::deep_clone`] when the clone will be mutated independently.
#[derive(Clone, Default)]
pub struct Element {
    pub(crate) value: Value,
}

impl Element {
    /// A view of the element whose type byte is at `start` and whose payload
    /// begins at `offset`. Nothing is checked until [`Element::validate`].
    #[inline]
    pub fn from_parts(data: Bytes, start: usize, offset: usize) -> Self {
        Self {
            value: Value::from_parts(data, start, offset),
        }
    }

    /// Reads the element at the front of `data`.
    ///
    /// Only the key and the payload framing are checked; nested containers
    /// are left for [`Element::validate`].
    pub fn read(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let tag = Tag::try_from(*data.first().ok_or(Error::EndOfFile)?)?;
        let key_len = cstr_len(&data, 1, data.len()).map_err(|_| Error::InvalidKey)?;
        let offset = 1 + key_len + 1;
        payload_len(tag, &data, offset)?;
        Ok(Self::from_parts(data, 0, offset))
    }

    /// Builds `[tag][key][0x00][payload]` in a fresh, tight buffer.
    fn assemble(key: &str, value: &Value, payload: Payload) -> Option<Self> {
        if !value.is_initialized() || key.as_bytes().contains(&0) {
            cold_path();
            return None;
        }
        let tag = value.tag().ok()?;
        let len = payload_len(tag, &value.data, value.offset).ok()?;

        let mut buf = BytesMut::with_capacity(2 + key.len() + len);
        buf.extend_from_slice(&[tag as u8]);
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(&[0]);
        buf.extend_from_slice(&value.data[value.offset..value.offset + len]);

        Some(Self {
            value: Value {
                data: buf.freeze(),
                start: 0,
                offset: key.len() + 2,
                payload,
            },
        })
    }

    /// Builds an element from a key and a borrowed value.
    ///
    /// A materialized payload is deep-copied so the element does not share
    /// mutable state with `value`. Returns `None` if `value` is uninitialized
    /// or `key` contains a null byte.
    pub fn from_key_and_value(key: &str, value: &Value) -> Option<Self> {
        Self::assemble(key, value, value.payload.deep_copy())
    }

    /// Builds an element taking ownership of `value` and its payload.
    pub fn new(key: &str, value: Value) -> Option<Self> {
        let payload = value.payload.clone();
        Self::assemble(key, &value, payload)
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    #[inline]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// A clone whose materialized payload is independent of `self`.
    pub fn deep_clone(&self) -> Self {
        Self {
            value: self.value.deep_copy(),
        }
    }
}

impl Element {
    /// Validates the element and returns its total encoded size.
    ///
    /// On failure the returned [`Partial`] carries the size accumulated up to
    /// the first violation.
    #[inline]
    pub fn validate(&self) -> std::result::Result<usize, Partial> {
        self.validate_with(&ValidateConfig::default())
    }

    #[inline]
    pub fn validate_with(&self, config: &ValidateConfig) -> std::result::Result<usize, Partial> {
        self.validate_at(0, config)
    }

    /// Like [`Element::validate`], reporting `NilElement` for `None`.
    pub fn validate_opt(element: Option<&Element>) -> std::result::Result<usize, Partial> {
        match element {
            Some(element) => element.validate(),
            None => Err(Error::NilElement.into()),
        }
    }

    pub(crate) fn validate_at(
        &self,
        depth: u32,
        config: &ValidateConfig,
    ) -> std::result::Result<usize, Partial> {
        if self.value.data.is_empty() {
            cold_path();
            return Err(Error::UninitializedValue.into());
        }

        let total = 1 + self.validate_key().map_err(|p| p.after(1))?;
        let n = self
            .value
            .validate_at(depth, config)
            .map_err(|p| p.after(total))?;
        Ok(total + n)
    }

    /// Scans the key and returns its length including the terminator.
    ///
    /// The first null byte after the type byte must sit right before the
    /// payload. The scan stops at the end of the buffer when the payload
    /// offset lies past it.
    fn validate_key(&self) -> std::result::Result<usize, Partial> {
        let value = &self.value;
        if value.start >= value.data.len() || value.offset <= value.start {
            cold_path();
            return Err(Error::UninitializedValue.into());
        }

        let end = value.offset.min(value.data.len());
        let key = &value.data[value.start + 1..end];
        match key.iter().position(|&b| b == 0) {
            Some(len) if len + 1 == key.len() && end == value.offset => Ok(len + 1),
            Some(len) => Err(Partial::new(len, Error::InvalidKey)),
            None => Err(Partial::new(key.len(), Error::InvalidKey)),
        }
    }

    /// Returns the key.
    ///
    /// # Panics
    ///
    /// Panics if the element is uninitialized or its key is malformed. Use
    /// [`Element::key_ok`] where that is not already established.
    pub fn key(&self) -> &str {
        match self.key_ok() {
            Some(key) => key,
            None => panic!("{}", Error::UninitializedValue),
        }
    }

    /// Returns the key, or `None` for an uninitialized or malformed element.
    pub fn key_ok(&self) -> Option<&str> {
        let value = &self.value;
        if !value.is_initialized() || value.offset < value.start + 2 {
            return None;
        }
        let key = &value.data[value.start + 1..value.offset - 1];
        if value.data[value.offset - 1] != 0 || key.contains(&0) {
            return None;
        }
        std::str::from_utf8(key).ok()
    }

    pub fn key_opt(element: Option<&Element>) -> Option<&str> {
        element.and_then(Element::key_ok)
    }

    /// Serializes the element into a new buffer of exactly its encoded size.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let size = self.validate()?;
        let mut buf = vec![0u8; size];
        self.write_into(true, 0, size, &mut buf)?;
        Ok(buf)
    }

    /// Rewrites framing lengths in the element's own buffer.
    ///
    /// See [`Value::normalize_header`]; this is the only operation that
    /// changes the bytes an element reads from.
    #[inline]
    pub fn normalize_header(&mut self) -> Result<bool> {
        self.value.normalize_header()
    }

    /// Same key and structurally equal values.
    pub fn equal(&self, other: &Element) -> bool {
        self.key_ok() == other.key_ok() && self.value.equal(&other.value)
    }

    /// Two absent elements are equal; an absent and a present one are not.
    pub fn equal_opt(a: Option<&Element>, b: Option<&Element>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.equal(b),
            _ => false,
        }
    }
}

impl PartialEq for Element {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.value.tag(), self.key_ok()) {
            (Ok(tag), Some(key)) => write!(f, "bson.Element{{[{tag}]{key:?}: {}}}", self.value),
            _ => f.write_str("bson.Element{<invalid>}"),
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
