//! Error types for BSON validation and writing operations.
//!
//! This module contains the [`Error`] type which represents all possible errors
//! that can occur when reading, validating or writing BSON elements, and the
//! [`Partial`] carrier that pairs an error with the progress made before it.
//!
//! # Example
//!
//! ```
//! use lazy_bson::{Document, Error, Result};
//!
//! fn try_parse(data: &[u8]) -> Result<()> {
//!     match Document::read(data.to_vec()) {
//!         Ok(_) => Ok(()),
//!         Err(Error::EndOfFile) => {
//!             println!("Data was truncated");
//!             Err(Error::EndOfFile)
//!         }
//!         Err(Error::InvalidTag(tag)) => {
//!             println!("Unknown element type: {:#04x}", tag);
//!             Err(Error::InvalidTag(tag))
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::fmt::{self, Display};

use crate::Tag;

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// This type represents all possible errors that can occur when validating or
/// writing BSON data.
#[derive(Debug)]
pub enum Error {
    Message(String),

    /// An I/O error occurred while writing to a [`std::io::Write`] target.
    IO(std::io::Error),

    /// An element was required but none was given.
    NilElement,

    /// The value, or the buffer behind it, was never initialized.
    UninitializedValue,

    /// The key of an element has no null terminator within its bounds.
    InvalidKey,

    /// The write target cannot hold the number of bytes requested.
    DestinationTooSmall { needed: usize, available: usize },

    /// The write target cannot be used for the requested write.
    ///
    /// Stream writers are not addressable, so only offset zero is accepted.
    InvalidWriteTarget,

    /// The input ended unexpectedly.
    ///
    /// This error occurs when a length prefix or a fixed-width field points
    /// past the end of the buffer.
    EndOfFile,

    /// An unknown BSON element type was encountered.
    InvalidTag(u8),

    /// A length prefix disagrees with the structure it frames.
    InvalidLength { declared: i64, actual: usize },

    /// A string or document is missing its null terminator.
    MissingTerminator,

    /// A boolean payload was neither 0 nor 1.
    InvalidBoolean(u8),

    /// Nested documents exceeded the configured depth.
    MaxDepthExceeded(u32),

    /// A typed accessor was called on a value of another type.
    TypeMismatch { expected: Tag, actual: Tag },

    /// A string payload or key is not valid UTF-8.
    InvalidUtf8,
}

/// An error together with the progress made before it occurred.
///
/// Validation reports the partial encoded size computed so far; writes report
/// the number of bytes already committed to the destination.
#[derive(Debug)]
pub struct Partial {
    pub progress: usize,
    pub error: Error,
}

impl Partial {
    #[inline]
    pub(crate) fn new(progress: usize, error: Error) -> Self {
        Self { progress, error }
    }

    /// Adds `n` bytes of progress made by the caller before delegating.
    #[inline]
    pub(crate) fn after(mut self, n: usize) -> Self {
        self.progress += n;
        self
    }
}

impl From<Error> for Partial {
    #[inline]
    fn from(error: Error) -> Self {
        Partial { progress: 0, error }
    }
}

impl From<Partial> for Error {
    #[inline]
    fn from(partial: Partial) -> Self {
        partial.error
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Message(message) => formatter.write_str(message),
            Error::IO(error) => formatter.write_str(&error.to_string()),
            Error::NilElement => formatter.write_str("element is nil"),
            Error::UninitializedValue => formatter.write_str("value is uninitialized"),
            Error::InvalidKey => formatter.write_str("key has no null terminator within bounds"),
            Error::DestinationTooSmall { needed, available } => formatter.write_str(&format!(
                "destination too small: {needed} bytes needed, {available} available"
            )),
            Error::InvalidWriteTarget => formatter.write_str("invalid write target"),
            Error::EndOfFile => formatter.write_str("unexpected end of input"),
            Error::InvalidTag(tag) => {
                formatter.write_str(&format!("invalid BSON element type: {tag:#04x}"))
            }
            Error::InvalidLength { declared, actual } => formatter.write_str(&format!(
                "length prefix mismatch: declared {declared}, actual {actual}"
            )),
            Error::MissingTerminator => formatter.write_str("missing null terminator"),
            Error::InvalidBoolean(byte) => {
                formatter.write_str(&format!("invalid boolean byte: {byte:#04x}"))
            }
            Error::MaxDepthExceeded(depth) => {
                formatter.write_str(&format!("maximum nesting depth {depth} exceeded"))
            }
            Error::TypeMismatch { expected, actual } => formatter.write_str(&format!(
                "type mismatch: expected {}, got {}",
                expected.name(),
                actual.name()
            )),
            Error::InvalidUtf8 => formatter.write_str("invalid UTF-8"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for Partial {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{} (after {} bytes)", self.error, self.progress)
    }
}

impl std::error::Error for Partial {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
