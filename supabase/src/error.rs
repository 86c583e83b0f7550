//! Unified error types for the Supabase SDK.

use std::ffi::c_char;

use supabase_ffi::{SupabaseClient, SupabaseError};

use crate::types::ErrorCode;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the Supabase SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A call into the library failed.
    #[error("{message}")]
    Ffi {
        /// Failure category.
        code: ErrorCode,
        /// Message recorded by the library.
        message: String,
    },

    /// A returned pointer was unexpectedly null.
    #[error("unexpected null pointer from FFI")]
    NullPointer,

    /// An argument passed to the SDK was invalid before reaching the library.
    #[error("{0}")]
    InvalidArgument(String),

    /// A result could not be (de)serialized as the requested type.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file I/O failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done, e.g. "write config /path".
        context: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O failure with what was being attempted.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The library's error code, if the failure came from the library.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Ffi { code, .. } => Some(*code),
            _ => None,
        }
    }
}

const MESSAGE_CAPACITY: usize = 1025;

fn from_buffer(code: SupabaseError, buf: &[u8]) -> Error {
    let message = std::ffi::CStr::from_bytes_until_nul(buf)
        .map(|c| c.to_string_lossy().into_owned())
        .unwrap_or_default();
    Error::Ffi {
        code: code.into(),
        message,
    }
}

/// Read the calling thread's last error.
pub(crate) fn last_thread_error() -> Error {
    let mut buf = [0_u8; MESSAGE_CAPACITY];
    let code =
        unsafe { supabase_ffi::supabase_get_last_error(buf.as_mut_ptr().cast::<c_char>(), buf.len()) };
    from_buffer(code, &buf)
}

/// Read a handle's last error.
pub(crate) fn last_client_error(handle: *const SupabaseClient) -> Error {
    let mut buf = [0_u8; MESSAGE_CAPACITY];
    let code = unsafe {
        supabase_ffi::client::supabase_client_last_error(
            handle,
            buf.as_mut_ptr().cast::<c_char>(),
            buf.len(),
        )
    };
    from_buffer(code, &buf)
}

/// Check a return code against a handle. `Success` = ok.
#[inline]
pub(crate) fn check(handle: *const SupabaseClient, rc: SupabaseError) -> Result<()> {
    if rc.is_ok() {
        Ok(())
    } else {
        Err(last_client_error(handle))
    }
}
