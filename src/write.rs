//! Re-serialization of elements into caller-provided buffers.
//!
//! A raw payload is copied verbatim. A materialized container only borrows
//! its framing from the source buffer and writes itself after it, sizing
//! itself as it goes; a code-with-scope payload additionally gets its outer
//! length recomputed in the destination.

use std::io::Write;

use crate::{
    Document, Element, Error, Partial, Payload, Result, Tag, Value, cold_path,
    size::payload_len,
    util::{encode_i32, len_i32, read_i32, read_len},
};

/// Where [`Element::write_element`] puts its bytes.
pub enum WriteTarget<'a> {
    /// A fixed buffer, written at the given offset.
    Slice(&'a mut [u8]),
    /// A growable buffer, extended with zeroes if it is too short.
    Vec(&'a mut Vec<u8>),
    /// A stream; only offset zero is addressable.
    Writer(&'a mut dyn Write),
}

#[inline]
fn too_small(needed: usize, available: usize) -> Error {
    cold_path();
    Error::DestinationTooSmall { needed, available }
}

/// Copies `src` to `dest[at..]`, which the caller has bounds-checked.
#[inline]
fn copy_at(dest: &mut [u8], at: usize, src: &[u8]) -> Result<usize> {
    let end = at + src.len();
    if end > dest.len() {
        return Err(too_small(end, dest.len()));
    }
    dest[at..end].copy_from_slice(src);
    Ok(src.len())
}

impl Element {
    /// Writes the element into `dest` at `start` and returns the number of
    /// bytes written.
    ///
    /// `size` must be the value returned by a successful [`Element::validate`].
    /// With `include_key` false the type byte and key are skipped and only the
    /// payload is written. The capacity check happens before any byte is
    /// written; nothing is ever written past `start + size` (or the payload
    /// share of it). The source buffer is never modified, so sibling views
    /// of it keep reading the bytes they were parsed from; length prefixes
    /// that change are corrected in `dest` only.
    pub fn write_into(
        &self,
        include_key: bool,
        start: usize,
        size: usize,
        dest: &mut [u8],
    ) -> std::result::Result<usize, Partial> {
        let value = &self.value;
        if !value.is_initialized() {
            cold_path();
            return Err(Error::UninitializedValue.into());
        }

        let header = value.offset - value.start;
        if size < header {
            cold_path();
            return Err(Error::InvalidLength {
                declared: size as i64,
                actual: header,
            }
            .into());
        }
        let len = if include_key { size } else { size - header };
        let needed = start.checked_add(len).ok_or(Error::EndOfFile)?;
        if dest.len() < needed {
            return Err(too_small(needed, dest.len()).into());
        }
        self.write_payload(include_key, start, Some(size), &mut dest[..needed])
    }

    /// Encoded size of a raw element, from its framing alone.
    fn raw_size(&self) -> Result<usize> {
        let value = &self.value;
        let tag = value.tag()?;
        Ok(value.offset - value.start + payload_len(tag, &value.data, value.offset)?)
    }

    /// Writes the element at `start` without a precomputed size.
    ///
    /// Materialized containers size themselves while writing and patch
    /// their length prefixes afterwards; raw payloads are sized from their
    /// framing. `dest` bounds the write.
    pub(crate) fn write_payload(
        &self,
        include_key: bool,
        start: usize,
        known: Option<usize>,
        dest: &mut [u8],
    ) -> std::result::Result<usize, Partial> {
        let value = &self.value;
        if !value.is_initialized() {
            cold_path();
            return Err(Error::UninitializedValue.into());
        }
        let write_from = if include_key { value.start } else { value.offset };
        let size = || match known {
            Some(size) => Ok(size),
            None => self.raw_size(),
        };

        let tag = value.tag()?;
        match (tag, &value.payload) {
            (Tag::CodeWithScope, Payload::Raw) => {
                write_raw_code_with_scope(value, write_from, start, size()?, dest)
            }
            (Tag::CodeWithScope, Payload::Document(scope)) => {
                write_code_with_scope(value, scope, write_from, start, dest)
            }
            (_, Payload::Raw) => Ok(copy_raw(value, write_from, start, size()?, dest)?),
            (Tag::EmbeddedDocument, Payload::Document(doc)) => {
                let n = copy_at(dest, start, &value.data[write_from..value.offset])?;
                log::trace!("writing materialized document at {}", start + n);
                let nn = doc.write_body(start + n, dest).map_err(|p| p.after(n))?;
                Ok(n + nn)
            }
            (Tag::Array, Payload::Array(arr)) => {
                let n = copy_at(dest, start, &value.data[write_from..value.offset])?;
                log::trace!("writing materialized array at {}", start + n);
                let nn = arr.write_body(start + n, dest).map_err(|p| p.after(n))?;
                Ok(n + nn)
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

    /// Validates the element and writes it, key included, to `target`.
    pub fn write_element(&self, start: usize, target: WriteTarget<'_>) -> Result<usize> {
        let size = self.validate()?;
        match target {
            WriteTarget::Slice(dest) => Ok(self.write_into(true, start, size, dest)?),
            WriteTarget::Vec(dest) => {
                let needed = start.checked_add(size).ok_or(Error::EndOfFile)?;
                if dest.len() < needed {
                    dest.resize(needed, 0);
                }
                Ok(self.write_into(true, start, size, dest)?)
            }
            WriteTarget::Writer(writer) => {
                if start != 0 {
                    cold_path();
                    return Err(Error::InvalidWriteTarget);
                }
                self.write_to(writer)
            }
        }
    }

    /// Marshals the element and writes it to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        let bytes = self.marshal()?;
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }
}

/// Copies `data[write_from..start_of_element + size]` verbatim.
fn copy_raw(
    value: &Value,
    write_from: usize,
    start: usize,
    size: usize,
    dest: &mut [u8],
) -> Result<usize> {
    let end = value.start.checked_add(size).ok_or(Error::EndOfFile)?;
    let src = value.data.get(write_from..end).ok_or(Error::EndOfFile)?;
    copy_at(dest, start, src)
}

/// Outer length field plus the code string of a code-with-scope payload.
#[inline]
fn code_prefix(value: &Value) -> Result<usize> {
    Ok(4 + 4 + read_len(&value.data, value.offset + 4)?)
}

/// `[i32 total][i32 code length][code][scope]` with a materialized scope.
///
/// The code string is copied from the source buffer, the scope writes
/// itself after it, and the outer length is then set in the destination.
fn write_code_with_scope(
    value: &Value,
    scope: &Document,
    write_from: usize,
    start: usize,
    dest: &mut [u8],
) -> std::result::Result<usize, Partial> {
    let prefix = code_prefix(value)?;
    let src = value
        .data
        .get(write_from..value.offset + prefix)
        .ok_or(Error::EndOfFile)?;
    let n = copy_at(dest, start, src)?;
    log::trace!("writing materialized scope at {}", start + n);
    let nn = scope.write_body(start + n, dest).map_err(|p| p.after(n))?;

    let header_at = start + (value.offset - write_from);
    let total = len_i32(prefix + nn).map_err(|e| Partial::new(n + nn, e))?;
    encode_i32(dest, header_at, total).map_err(|e| Partial::new(n + nn, e))?;
    Ok(n + nn)
}

/// Copies a raw code-with-scope payload, correcting its outer length in the
/// destination when it disagrees with the code string and scope.
fn write_raw_code_with_scope(
    value: &Value,
    write_from: usize,
    start: usize,
    size: usize,
    dest: &mut [u8],
) -> std::result::Result<usize, Partial> {
    let prefix = code_prefix(value)?;
    let scope_len = read_len(&value.data, value.offset + prefix)?;
    let total = len_i32(prefix + scope_len)?;
    let declared = read_i32(&value.data, value.offset)?;
    let n = copy_raw(value, write_from, start, size, dest)?;
    if declared != total {
        log::debug!("code-with-scope length corrected from {declared} to {total} while writing");
        let header_at = start + (value.offset - write_from);
        encode_i32(dest, header_at, total).map_err(|e| Partial::new(n, e))?;
    }
    Ok(n)
}
