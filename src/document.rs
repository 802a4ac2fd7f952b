use std::fmt;

use bytes::Bytes;

use crate::{
    Element, Error, Partial, Result, Tag, ValidateConfig, Value, cold_path,
    size::payload_len,
    util::{cstr_len, encode_i32, len_i32, read_len},
};

/// An ordered list of elements.
///
/// Elements read from a buffer share it; nested containers stay raw until
/// they are asked for mutably.
#[derive(Clone, Default)]
pub struct Document {
    pub(crate) elements: Vec<Element>,
}

impl Document {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a complete document into elements without decoding payloads.
    ///
    /// The buffer must hold exactly one document.
    pub fn read(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let doc = Self::read_at(data.clone(), 0)?;
        let declared = read_len(&data, 0)?;
        if declared != data.len() {
            cold_path();
            return Err(Error::InvalidLength {
                declared: declared as i64,
                actual: data.len(),
            });
        }
        Ok(doc)
    }

    /// Splits the document whose length prefix sits at `offset`.
    pub(crate) fn read_at(data: Bytes, offset: usize) -> Result<Self> {
        let declared = read_len(&data, offset)?;
        let end = offset
            .checked_add(declared)
            .filter(|&end| declared >= 5 && end <= data.len())
            .ok_or(Error::InvalidLength {
                declared: declared as i64,
                actual: data.len().saturating_sub(offset),
            })?;
        let body = &data[..end];

        let mut elements = Vec::new();
        let mut pos = offset + 4;
        loop {
            let tag_byte = *body.get(pos).ok_or(Error::MissingTerminator)?;
            if tag_byte == 0 {
                break;
            }
            let tag = Tag::try_from(tag_byte)?;
            let key_len = cstr_len(body, pos + 1, end).map_err(|_| Error::InvalidKey)?;
            let payload_at = pos + 1 + key_len + 1;
            let len = payload_len(tag, body, payload_at)?;
            elements.push(Element::from_parts(data.clone(), pos, payload_at));
            pos = payload_at + len;
        }

        if pos + 1 != end {
            cold_path();
            return Err(Error::InvalidLength {
                declared: declared as i64,
                actual: pos + 1 - offset,
            });
        }
        Ok(Self { elements })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Element> {
        self.elements.iter_mut()
    }

    /// Appends an element without checking for a duplicate key.
    #[inline]
    pub fn append(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    /// Replaces the element with `key`, or appends one, and returns the
    /// replaced element.
    pub fn set(&mut self, key: &str, value: Value) -> Result<Option<Element>> {
        let element = match Element::new(key, value) {
            Some(element) => element,
            None => {
                cold_path();
                return Err(if key.as_bytes().contains(&0) {
                    Error::InvalidKey
                } else {
                    Error::UninitializedValue
                });
            }
        };
        match self.position(key) {
            Some(index) => Ok(Some(std::mem::replace(&mut self.elements[index], element))),
            None => {
                self.elements.push(element);
                Ok(None)
            }
        }
    }

    #[inline]
    fn position(&self, key: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|element| element.key_ok() == Some(key))
    }

    pub fn lookup(&self, key: &str) -> Option<&Element> {
        self.position(key).map(|index| &self.elements[index])
    }

    pub fn lookup_mut(&mut self, key: &str) -> Option<&mut Element> {
        self.position(key).map(|index| &mut self.elements[index])
    }

    /// Value of the element with `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.lookup(key).map(Element::value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Element> {
        self.position(key).map(|index| self.elements.remove(index))
    }

    /// Validates every element and returns the encoded document size.
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
        if depth > config.max_depth {
            cold_path();
            return Err(Error::MaxDepthExceeded(config.max_depth).into());
        }
        let mut total = 4;
        for element in &self.elements {
            let sized = total;
            total += element
                .validate_at(depth, config)
                .map_err(|p| p.after(sized))?;
        }
        Ok(total + 1)
    }

    /// Writes the document at `start` and returns the number of bytes written.
    ///
    /// `size` must come from [`Document::validate`]; it bounds the write and
    /// is checked before anything is written.
    pub fn write_into(
        &self,
        start: usize,
        size: usize,
        dest: &mut [u8],
    ) -> std::result::Result<usize, Partial> {
        let end = start.checked_add(size).ok_or(Error::EndOfFile)?;
        if dest.len() < end {
            cold_path();
            return Err(Error::DestinationTooSmall {
                needed: end,
                available: dest.len(),
            }
            .into());
        }
        self.write_body(start, &mut dest[..end])
    }

    /// Writes the elements after a length prefix that is filled in last.
    ///
    /// Children are not revalidated; each sizes itself as it is written.
    pub(crate) fn write_body(
        &self,
        start: usize,
        dest: &mut [u8],
    ) -> std::result::Result<usize, Partial> {
        let mut pos = reserve_prefix(dest, start)?;
        for element in &self.elements {
            let written = pos - start;
            pos += element
                .write_payload(true, pos, None, dest)
                .map_err(|p| p.after(written))?;
        }
        let n = terminate(dest, start, pos)?;
        encode_i32(dest, start, len_i32(n)?).map_err(|e| Partial::new(n, e))?;
        Ok(n)
    }

    /// Serializes the document into a new buffer.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let size = self.validate()?;
        let mut buf = vec![0u8; size];
        self.write_into(0, size, &mut buf)?;
        Ok(buf)
    }

    /// A copy sharing no materialized payload with `self`.
    pub fn copy(&self) -> Self {
        Self {
            elements: self.elements.iter().map(Element::deep_clone).collect(),
        }
    }

    /// Same elements in the same order.
    pub fn equal(&self, other: &Document) -> bool {
        self.len() == other.len()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| a.equal(b))
    }

    /// Runs [`Element::normalize_header`] on every element and returns how
    /// many were corrected.
    pub fn normalize_headers(&mut self) -> Result<usize> {
        let mut corrected = 0;
        for element in &mut self.elements {
            if element.normalize_header()? {
                corrected += 1;
            }
        }
        Ok(corrected)
    }
}

/// Checks that a length prefix fits at `start` and returns the position
/// after it.
pub(crate) fn reserve_prefix(dest: &[u8], start: usize) -> std::result::Result<usize, Partial> {
    match start.checked_add(4) {
        Some(pos) if pos <= dest.len() => Ok(pos),
        _ => {
            cold_path();
            Err(Error::DestinationTooSmall {
                needed: start.saturating_add(4),
                available: dest.len(),
            }
            .into())
        }
    }
}

/// Writes the closing null byte at `pos` and returns the bytes written since
/// `start`.
pub(crate) fn terminate(
    dest: &mut [u8],
    start: usize,
    pos: usize,
) -> std::result::Result<usize, Partial> {
    match dest.get_mut(pos) {
        Some(slot) => {
            *slot = 0;
            Ok(pos + 1 - start)
        }
        None => {
            cold_path();
            Err(Partial::new(
                pos - start,
                Error::DestinationTooSmall {
                    needed: pos + 1,
                    available: dest.len(),
                },
            ))
        }
    }
}

impl PartialEq for Document {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl FromIterator<Element> for Document {
    fn from_iter<T: IntoIterator<Item = Element>>(iter: T) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("bson.Document{")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
