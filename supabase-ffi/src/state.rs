//! Last-error store. Each client handle owns one; each calling thread owns one.

use std::ffi::c_char;

use crate::buffer::write_truncated;
use crate::error::{Error, SupabaseError};

/// Upper bound on a stored message, in bytes (excluding the NUL).
pub const MAX_MESSAGE_LEN: usize = 1024;

/// The most recent failure in one scope.
///
/// `sequence` counts recorded failures and never decreases, so a caller can tell
/// whether the message it read earlier has been replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    code: SupabaseError,
    message: String,
    sequence: u64,
}

impl ErrorState {
    /// Overwrite the stored failure.
    pub fn record(&mut self, code: SupabaseError, message: &str) {
        self.code = code;
        self.message.clear();
        self.message
            .push_str(&message[..floor_char_boundary(message, MAX_MESSAGE_LEN)]);
        self.sequence += 1;
    }

    /// Record an internal error using its mapped code and display text.
    pub fn record_error(&mut self, err: &Error) {
        self.record(err.code(), &err.to_string());
    }

    /// Forget the stored failure. The sequence is kept.
    pub fn reset(&mut self) {
        self.code = SupabaseError::Success;
        self.message.clear();
    }

    /// Last recorded code, or `Success`.
    #[must_use]
    pub const fn code(&self) -> SupabaseError {
        self.code
    }

    /// Last recorded message, empty when there is none.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Number of failures recorded in this scope so far.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Copy the message into `buf` and return the code.
    ///
    /// The copy is cut on a UTF-8 boundary and always NUL-terminated. A null
    /// `buf` or zero `buf_len` skips the copy.
    ///
    /// # Safety
    ///
    /// `buf` must be null or valid for `buf_len` bytes of writes.
    pub unsafe fn copy_out(&self, buf: *mut c_char, buf_len: usize) -> SupabaseError {
        if !buf.is_null() && buf_len > 0 {
            unsafe { write_truncated(buf, buf_len, &self.message) };
        }
        self.code
    }
}

/// Largest index `<= max` that falls on a char boundary of `s`.
pub(crate) fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut i = max;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
