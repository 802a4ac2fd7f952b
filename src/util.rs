use zerocopy::{LittleEndian, byteorder};

use crate::{Error, Result};

#[inline(always)]
#[cold]
pub(crate) fn cold_path() {}

#[inline]
fn fixed<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let end = offset.checked_add(N).ok_or(Error::EndOfFile)?;
    match buf.get(offset..end) {
        Some(bytes) => {
            let mut out = [0u8; N];
            out.copy_from_slice(bytes);
            Ok(out)
        }
        None => {
            cold_path();
            Err(Error::EndOfFile)
        }
    }
}

#[inline]
pub fn read_i32(buf: &[u8], offset: usize) -> Result<i32> {
    Ok(byteorder::I32::<LittleEndian>::from_bytes(fixed(buf, offset)?).get())
}

#[inline]
pub fn read_i64(buf: &[u8], offset: usize) -> Result<i64> {
    Ok(byteorder::I64::<LittleEndian>::from_bytes(fixed(buf, offset)?).get())
}

#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    Ok(byteorder::U32::<LittleEndian>::from_bytes(fixed(buf, offset)?).get())
}

#[inline]
pub fn read_f64(buf: &[u8], offset: usize) -> Result<f64> {
    Ok(byteorder::F64::<LittleEndian>::from_bytes(fixed(buf, offset)?).get())
}

#[inline]
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    fixed(buf, offset)
}

/// Writes a little-endian `i32` at `offset`, failing if it does not fit.
#[inline]
pub fn encode_i32(buf: &mut [u8], offset: usize, value: i32) -> Result<()> {
    let end = offset.checked_add(4).ok_or(Error::EndOfFile)?;
    match buf.get_mut(offset..end) {
        Some(slot) => {
            slot.copy_from_slice(&byteorder::I32::<LittleEndian>::new(value).to_bytes());
            Ok(())
        }
        None => {
            cold_path();
            Err(Error::EndOfFile)
        }
    }
}

/// Reads a length prefix that must be non-negative.
#[inline]
pub(crate) fn read_len(buf: &[u8], offset: usize) -> Result<usize> {
    let len = read_i32(buf, offset)?;
    usize::try_from(len).map_err(|_| Error::InvalidLength {
        declared: len as i64,
        actual: 0,
    })
}

/// Converts an encoded size to the `i32` used by length prefixes.
#[inline]
pub(crate) fn len_i32(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::InvalidLength {
        declared: i32::MAX as i64,
        actual: len,
    })
}

/// Length of the C string at `offset`, excluding its terminator.
///
/// The terminator must be found before `limit`.
#[inline]
pub fn cstr_len(buf: &[u8], offset: usize, limit: usize) -> Result<usize> {
    let limit = limit.min(buf.len());
    let region = buf.get(offset..limit).ok_or(Error::EndOfFile)?;
    match region.iter().position(|&b| b == 0) {
        Some(len) => Ok(len),
        None => {
            cold_path();
            Err(Error::MissingTerminator)
        }
    }
}

pub(crate) static EMPTY_DOCUMENT: [u8; 5] = [5, 0, 0, 0, 0];
