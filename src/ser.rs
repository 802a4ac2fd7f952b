//! `serde::Serialize` for documents, arrays, elements and values.
//!
//! Documents serialize as maps in element order, arrays as sequences. Types
//! with no serde counterpart use tuples: `(subtype, bytes)` for binary,
//! `(pattern, options)` for regex, `(code, scope)` for code-with-scope and
//! `(time, increment)` for timestamps.

use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::{Array, Document, Element, Error, Tag, Value};

fn custom<S: Serializer>(error: Error) -> S::Error {
    S::Error::custom(error)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tag = self.tag().map_err(custom::<S>)?;
        match tag {
            Tag::Double => serializer.serialize_f64(self.as_f64().map_err(custom::<S>)?),
            Tag::String => serializer.serialize_str(self.as_str().map_err(custom::<S>)?),
            Tag::EmbeddedDocument => self
                .as_document()
                .map_err(custom::<S>)?
                .serialize(serializer),
            Tag::Array => self.as_array().map_err(custom::<S>)?.serialize(serializer),
            Tag::Binary => {
                let (subtype, data) = self.as_binary().map_err(custom::<S>)?;
                (subtype, serde_bytes(data)).serialize(serializer)
            }
            Tag::Undefined | Tag::Null | Tag::MinKey | Tag::MaxKey => serializer.serialize_unit(),
            Tag::ObjectId => serializer.serialize_bytes(&self.as_object_id().map_err(custom::<S>)?),
            Tag::Boolean => serializer.serialize_bool(self.as_bool().map_err(custom::<S>)?),
            Tag::DateTime => serializer.serialize_i64(self.as_date_time().map_err(custom::<S>)?),
            Tag::Regex => self.as_regex().map_err(custom::<S>)?.serialize(serializer),
            Tag::DbPointer => {
                let (namespace, id) = self.as_db_pointer().map_err(custom::<S>)?;
                (namespace, serde_bytes(&id)).serialize(serializer)
            }
            Tag::JavaScript => serializer.serialize_str(self.as_javascript().map_err(custom::<S>)?),
            Tag::Symbol => serializer.serialize_str(self.as_symbol().map_err(custom::<S>)?),
            Tag::CodeWithScope => self
                .as_code_with_scope()
                .map_err(custom::<S>)?
                .serialize(serializer),
            Tag::Int32 => serializer.serialize_i32(self.as_i32().map_err(custom::<S>)?),
            Tag::Timestamp => self.as_timestamp().map_err(custom::<S>)?.serialize(serializer),
            Tag::Int64 => serializer.serialize_i64(self.as_i64().map_err(custom::<S>)?),
            Tag::Decimal128 => {
                serializer.serialize_bytes(&self.as_decimal128().map_err(custom::<S>)?)
            }
        }
    }
}

/// Serializes a byte slice through `serialize_bytes` instead of as a sequence.
struct RawBytes<'a>(&'a [u8]);

#[inline]
fn serde_bytes(data: &[u8]) -> RawBytes<'_> {
    RawBytes(data)
}

impl Serialize for RawBytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for element in self {
            let key = element.key_ok().ok_or_else(|| custom::<S>(Error::InvalidKey))?;
            map.serialize_entry(key, element.value())?;
        }
        map.end()
    }
}

impl Serialize for Array {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for value in self.iter() {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let key = self.key_ok().ok_or_else(|| custom::<S>(Error::InvalidKey))?;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(key, self.value())?;
        map.end()
    }
}
