//! Copy-out into caller-owned buffers. Capacity is a hard upper bound.

use std::ffi::c_char;
use std::ptr;

use crate::error::{Error, Result};
use crate::state::floor_char_boundary;

/// Write `payload` plus a NUL terminator, or nothing at all.
///
/// Fails with [`Error::BufferTooSmall`] when `payload.len() + 1 > buf_len`; the
/// buffer is left untouched in that case.
///
/// # Safety
///
/// `buf` must be valid for `buf_len` bytes of writes.
pub(crate) unsafe fn write_payload(buf: *mut c_char, buf_len: usize, payload: &str) -> Result<()> {
    let required = payload.len() + 1;
    if required > buf_len {
        return Err(Error::BufferTooSmall {
            required,
            capacity: buf_len,
        });
    }
    unsafe {
        ptr::copy_nonoverlapping(payload.as_ptr(), buf.cast::<u8>(), payload.len());
        *buf.add(payload.len()) = 0;
    }
    Ok(())
}

/// Write as much of `s` as fits, cut on a UTF-8 boundary, always NUL-terminated.
/// Returns the number of bytes written, excluding the NUL.
///
/// # Safety
///
/// `buf` must be non-null and valid for `buf_len >= 1` bytes of writes.
pub(crate) unsafe fn write_truncated(buf: *mut c_char, buf_len: usize, s: &str) -> usize {
    let n = floor_char_boundary(s, buf_len - 1);
    unsafe {
        ptr::copy_nonoverlapping(s.as_ptr(), buf.cast::<u8>(), n);
        *buf.add(n) = 0;
    }
    n
}

/// Reject a missing or zero-sized output buffer before any remote work happens.
pub(crate) fn check_out_buffer(buf: *const c_char, buf_len: usize) -> Result<()> {
    if buf.is_null() {
        return Err(Error::invalid("null output buffer"));
    }
    if buf_len == 0 {
        return Err(Error::invalid("output buffer capacity is zero"));
    }
    Ok(())
}
