use std::fmt;

use bytes::Bytes;

use crate::{
    Document, Element, Error, Partial, Result, ValidateConfig, Value, cold_path,
    document::{reserve_prefix, terminate},
    util::{encode_i32, len_i32},
};

/// A document whose keys are the decimal indices of its values.
///
/// Keys are regenerated from positions whenever the array is sized or
/// written, so removing an element never leaves a gap on the wire.
#[derive(Clone, Default)]
pub struct Array {
    pub(crate) doc: Document,
}

/// Decimal digits of `usize::MAX`.
const MAX_INDEX_LEN: usize = 20;

#[inline]
fn index_len(index: usize) -> usize {
    index.checked_ilog10().unwrap_or(0) as usize + 1
}

/// Formats `index` in decimal into the tail of `buf`.
fn index_key(mut index: usize, buf: &mut [u8; MAX_INDEX_LEN]) -> &[u8] {
    let mut at = MAX_INDEX_LEN;
    loop {
        at -= 1;
        buf[at] = b'0' + (index % 10) as u8;
        index /= 10;
        if index == 0 {
            break;
        }
    }
    &buf[at..]
}

impl Array {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a complete array document into elements.
    pub fn read(data: impl Into<Bytes>) -> Result<Self> {
        Ok(Self {
            doc: Document::read(data)?,
        })
    }

    pub(crate) fn read_at(data: Bytes, offset: usize) -> Result<Self> {
        Ok(Self {
            doc: Document::read_at(data, offset)?,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.doc.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.doc.iter().map(Element::value)
    }

    pub fn push(&mut self, value: Value) -> Result<&mut Self> {
        let key = self.len().to_string();
        match Element::new(&key, value) {
            Some(element) => {
                self.doc.append(element);
                Ok(self)
            }
            None => {
                cold_path();
                Err(Error::UninitializedValue)
            }
        }
    }

    /// Builds an array from `values` in order.
    ///
    /// Fails with `UninitializedValue` on the first uninitialized value.
    pub fn try_from_values<I: IntoIterator<Item = Value>>(values: I) -> Result<Self> {
        let mut array = Array::new();
        for value in values {
            array.push(value)?;
        }
        Ok(array)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.doc.elements.get(index).map(Element::value)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.doc.elements.get_mut(index).map(Element::value_mut)
    }

    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        Some(self.doc.elements.remove(index).into_value())
    }

    #[inline]
    pub fn validate(&self) -> std::result::Result<usize, Partial> {
        self.validate_at(0, &ValidateConfig::default())
    }

    #[inline]
    pub fn validate_with(&self, config: &ValidateConfig) -> std::result::Result<usize, Partial> {
        self.validate_at(0, config)
    }

    /// Sized with index keys, whatever keys the elements carry.
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
        for (index, element) in self.doc.iter().enumerate() {
            let sized = total;
            let size = element
                .validate_at(depth, config)
                .map_err(|p| p.after(sized))?;
            let header = element.value.offset - element.value.start;
            total += 1 + index_len(index) + 1 + (size - header);
        }
        Ok(total + 1)
    }

    /// Writes the array at `start` with index keys and returns the number of
    /// bytes written.
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

    pub(crate) fn write_body(
        &self,
        start: usize,
        dest: &mut [u8],
    ) -> std::result::Result<usize, Partial> {
        let mut pos = reserve_prefix(dest, start)?;
        let mut digits = [0u8; MAX_INDEX_LEN];
        for (index, element) in self.doc.iter().enumerate() {
            let written = pos - start;
            let tag = element.value.tag().map_err(|e| Partial::new(written, e))?;
            let key = index_key(index, &mut digits);

            let header_end = pos + 1 + key.len() + 1;
            if header_end > dest.len() {
                cold_path();
                return Err(Partial::new(
                    written,
                    Error::DestinationTooSmall {
                        needed: header_end,
                        available: dest.len(),
                    },
                ));
            }
            dest[pos] = tag as u8;
            dest[pos + 1..header_end - 1].copy_from_slice(key);
            dest[header_end - 1] = 0;
            pos = header_end;

            let written = pos - start;
            pos += element
                .write_payload(false, pos, None, dest)
                .map_err(|p| p.after(written))?;
        }
        let n = terminate(dest, start, pos)?;
        encode_i32(dest, start, len_i32(n)?).map_err(|e| Partial::new(n, e))?;
        Ok(n)
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        let size = self.validate()?;
        let mut buf = vec![0u8; size];
        self.write_into(0, size, &mut buf)?;
        Ok(buf)
    }

    pub fn copy(&self) -> Self {
        Self {
            doc: self.doc.copy(),
        }
    }

    /// Same values in the same order; keys are not compared.
    pub fn equal(&self, other: &Array) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a.equal(b))
    }
}

impl PartialEq for Array {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("bson.Array[")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
