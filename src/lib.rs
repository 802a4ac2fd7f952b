//! A lazy, allocation-minimizing BSON element codec.
//!
//! Parsing splits a buffer into [`Element`]s that point into it; nothing is
//! decoded until asked for. Validation walks an element once and returns its
//! exact encoded size, which is what [`Element::write_into`] needs to copy the
//! element back out. Containers that were edited are written from their
//! materialized form, with length prefixes recomputed.
//!
//! # Example
//!
//! ```
//! use lazy_bson::{Document, Value};
//!
//! let data = vec![
//!     0x14, 0, 0, 0, // document length
//!     0x03, b'd', 0, // embedded document "d"
//!     0x0C, 0, 0, 0, 0x10, b'n', 0, 1, 0, 0, 0, 0, // {"n": 1}
//!     0, // end of document
//! ];
//! let mut doc = Document::read(data).unwrap();
//! let element = doc.lookup_mut("d").unwrap();
//! element
//!     .value_mut()
//!     .document_mut()
//!     .unwrap()
//!     .set("m", Value::string("grown"))
//!     .unwrap();
//!
//! let bytes = doc.marshal().unwrap();
//! let reread = Document::read(bytes).unwrap();
//! let inner = reread.get("d").unwrap().as_document().unwrap();
//! assert_eq!(inner.get("m").unwrap().as_str().unwrap(), "grown");
//! ```

pub mod array;
pub mod config;
pub mod document;
pub mod element;
pub mod error;
#[cfg(feature = "serde")]
mod ser;
pub mod size;
pub mod tag;
mod util;
pub mod value;
mod write;

pub use array::Array;
pub use config::*;
pub use document::Document;
pub use element::Element;
pub use error::*;
pub use tag::Tag;
pub use util::{cstr_len, encode_i32, read_f64, read_i32, read_i64, read_u32};
pub(crate) use util::cold_path;
pub use value::{Payload, Value};
pub use write::WriteTarget;
