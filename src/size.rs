//! Structural sizing of raw payloads.
//!
//! [`payload_len`] is the cheap, non-recursive length used while splitting a
//! document into elements. [`validate_payload`] walks nested structures and
//! checks every framing byte on the way.

use crate::{
    Error, Partial, Result, Tag, ValidateConfig, cold_path,
    util::{cstr_len, read_i32, read_len},
};

#[inline]
fn ensure(data: &[u8], offset: usize, len: usize) -> Result<usize> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(len),
        _ => {
            cold_path();
            Err(Error::EndOfFile)
        }
    }
}

/// `[i32 len][bytes][0x00]`, the length counting the terminator.
pub(crate) fn string_len(data: &[u8], offset: usize) -> Result<usize> {
    let len = read_len(data, offset)?;
    if len == 0 {
        cold_path();
        return Err(Error::InvalidLength {
            declared: 0,
            actual: 1,
        });
    }
    ensure(data, offset + 4, len)?;
    if data[offset + 4 + len - 1] != 0 {
        cold_path();
        return Err(Error::MissingTerminator);
    }
    Ok(4 + len)
}

fn document_len(data: &[u8], offset: usize) -> Result<usize> {
    let len = read_len(data, offset)?;
    if len < 5 {
        cold_path();
        return Err(Error::InvalidLength {
            declared: len as i64,
            actual: 5,
        });
    }
    ensure(data, offset, len)
}

/// Encoded length of a payload, descending into nothing.
///
/// Containers are sized by their length prefix. Code-with-scope is sized
/// from its code string and scope prefix rather than its outer header.
pub fn payload_len(tag: Tag, data: &[u8], offset: usize) -> Result<usize> {
    match tag {
        Tag::String | Tag::JavaScript | Tag::Symbol => string_len(data, offset),
        Tag::EmbeddedDocument | Tag::Array => document_len(data, offset),
        Tag::Binary => {
            let len = read_len(data, offset)?;
            ensure(data, offset, 5 + len)
        }
        Tag::Regex => {
            let pattern = cstr_len(data, offset, data.len())?;
            let options = cstr_len(data, offset + pattern + 1, data.len())?;
            Ok(pattern + 1 + options + 1)
        }
        Tag::DbPointer => {
            let name = string_len(data, offset)?;
            ensure(data, offset, name + 12)
        }
        Tag::CodeWithScope => {
            ensure(data, offset, 4)?;
            let code = string_len(data, offset + 4)?;
            let scope = document_len(data, offset + 4 + code)?;
            Ok(4 + code + scope)
        }
        fixed => ensure(data, offset, fixed.fixed_size().unwrap_or_default()),
    }
}

/// Validates the payload of `tag` at `offset` and returns its encoded length.
///
/// `depth` counts the containers enclosing the payload.
pub fn validate_payload(
    tag: Tag,
    data: &[u8],
    offset: usize,
    depth: u32,
    config: &ValidateConfig,
) -> std::result::Result<usize, Partial> {
    match tag {
        Tag::EmbeddedDocument | Tag::Array => validate_document(data, offset, depth + 1, config),
        Tag::CodeWithScope => validate_code_with_scope(data, offset, depth + 1, config),
        Tag::Boolean => {
            ensure(data, offset, 1)?;
            match data[offset] {
                0 | 1 => Ok(1),
                other => Err(Error::InvalidBoolean(other).into()),
            }
        }
        _ => Ok(payload_len(tag, data, offset)?),
    }
}

/// One open document in [`validate_document`]'s walk.
struct Frame {
    /// One past the document's terminator.
    end: usize,
    /// Next tag byte.
    pos: usize,
    /// Bytes of this document sized so far.
    total: usize,
    depth: u32,
    /// Progress made outside this document, for error reporting.
    base: usize,
    /// Element header plus any framing before the document (the code string
    /// of a code-with-scope), counted in the parent on close.
    prefix: usize,
}

impl Frame {
    fn open(
        data: &[u8],
        offset: usize,
        depth: u32,
        config: &ValidateConfig,
        base: usize,
        prefix: usize,
    ) -> std::result::Result<Self, Partial> {
        if depth > config.max_depth {
            cold_path();
            return Err(Partial::new(base, Error::MaxDepthExceeded(config.max_depth)));
        }
        let declared = document_len(data, offset).map_err(|e| Partial::new(base, e))?;
        Ok(Self {
            end: offset + declared,
            pos: offset + 4,
            total: 4,
            depth,
            base,
            prefix,
        })
    }

    #[inline]
    fn fail(&self, error: Error) -> Partial {
        Partial::new(self.base + self.total, error)
    }
}

/// Validates a raw document (or array) starting at its length prefix.
///
/// Every child key and payload is checked, and the children plus framing
/// must add up to the declared length. Nested raw documents are walked with
/// an explicit stack, so input depth is bounded by `config.max_depth` alone
/// and not by the thread's stack.
pub fn validate_document(
    data: &[u8],
    offset: usize,
    depth: u32,
    config: &ValidateConfig,
) -> std::result::Result<usize, Partial> {
    let mut stack = vec![Frame::open(data, offset, depth, config, 0, 0)?];

    while let Some(frame) = stack.last_mut() {
        let body = &data[..frame.end];
        let Some(&tag_byte) = body.get(frame.pos) else {
            cold_path();
            return Err(frame.fail(Error::MissingTerminator));
        };

        if tag_byte == 0 {
            frame.total += 1;
            frame.pos += 1;
            if frame.pos != frame.end {
                cold_path();
                let declared = frame.end - (frame.pos - frame.total);
                return Err(frame.fail(Error::InvalidLength {
                    declared: declared as i64,
                    actual: frame.total,
                }));
            }
            let Some(done) = stack.pop() else { break };
            match stack.last_mut() {
                Some(parent) => {
                    parent.total += done.prefix + done.total;
                    parent.pos = done.end;
                }
                None => return Ok(done.total),
            }
            continue;
        }

        let tag = Tag::try_from(tag_byte).map_err(|e| frame.fail(e))?;
        let key_len =
            cstr_len(body, frame.pos + 1, frame.end).map_err(|_| frame.fail(Error::InvalidKey))?;
        let header = 1 + key_len + 1;
        let payload_at = frame.pos + header;
        let base = frame.base + frame.total + header;

        let child = match tag {
            Tag::EmbeddedDocument | Tag::Array => {
                Frame::open(body, payload_at, frame.depth + 1, config, base, header)?
            }
            Tag::CodeWithScope => {
                read_i32(body, payload_at).map_err(|e| Partial::new(base, e))?;
                let code = string_len(body, payload_at + 4).map_err(|e| Partial::new(base + 4, e))?;
                Frame::open(
                    body,
                    payload_at + 4 + code,
                    frame.depth + 1,
                    config,
                    base + 4 + code,
                    header + 4 + code,
                )?
            }
            _ => {
                let n = validate_payload(tag, body, payload_at, frame.depth, config)
                    .map_err(|p| p.after(base))?;
                frame.total += header + n;
                frame.pos = payload_at + n;
                continue;
            }
        };
        log::trace!("descending into {} at depth {}", tag.name(), child.depth);
        stack.push(child);
    }
    Err(Error::MissingTerminator.into())
}

/// `[i32 total][string code][document scope]`, sized from its parts.
fn validate_code_with_scope(
    data: &[u8],
    offset: usize,
    depth: u32,
    config: &ValidateConfig,
) -> std::result::Result<usize, Partial> {
    read_i32(data, offset)?;
    let code = string_len(data, offset + 4).map_err(|e| Partial::new(4, e))?;
    let scope = validate_document(data, offset + 4 + code, depth, config)
        .map_err(|p| p.after(4 + code))?;
    Ok(4 + code + scope)
}
