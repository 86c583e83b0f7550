//! Error codes exposed to C and the internal error type they are derived from.

use std::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes returned by every fallible C function.
///
/// Values never change meaning. New codes are appended.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupabaseError {
    /// The call succeeded.
    #[default]
    Success = 0,
    /// An argument was null, blank, not UTF-8 or otherwise malformed.
    InvalidInput = 1,
    /// The request never produced an HTTP response (DNS, refused, timeout, I/O).
    NetworkError = 2,
    /// The auth service rejected the request.
    AuthError = 3,
    /// The REST (database) service rejected the request.
    DatabaseError = 4,
    /// The storage service rejected the request.
    StorageError = 5,
    /// The edge function failed or returned a non-2xx status.
    FunctionsError = 6,
    /// Reserved for realtime subscriptions.
    RealtimeError = 7,
    /// Internal failure, such as an unparseable success response.
    RuntimeError = 8,
    /// The success payload does not fit the caller's buffer.
    BufferTooSmall = 9,
    /// Unexpected failure (a caught panic).
    UnknownError = 99,
}

impl SupabaseError {
    /// Whether the code indicates success.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Map a raw integer back to a code. Unknown values become [`Self::UnknownError`].
    #[must_use]
    pub const fn from_raw(v: i32) -> Self {
        match v {
            0 => Self::Success,
            1 => Self::InvalidInput,
            2 => Self::NetworkError,
            3 => Self::AuthError,
            4 => Self::DatabaseError,
            5 => Self::StorageError,
            6 => Self::FunctionsError,
            7 => Self::RealtimeError,
            8 => Self::RuntimeError,
            9 => Self::BufferTooSmall,
            _ => Self::UnknownError,
        }
    }
}

/// Remote service a request was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// GoTrue (`/auth/v1`).
    Auth,
    /// PostgREST (`/rest/v1`).
    Database,
    /// Storage API (`/storage/v1`).
    Storage,
    /// Edge functions (`/functions/v1`).
    Functions,
}

impl Service {
    /// Code reported when this service answers with a non-2xx status.
    #[must_use]
    pub const fn error_code(self) -> SupabaseError {
        match self {
            Self::Auth => SupabaseError::AuthError,
            Self::Database => SupabaseError::DatabaseError,
            Self::Storage => SupabaseError::StorageError,
            Self::Functions => SupabaseError::FunctionsError,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auth => "auth",
            Self::Database => "database",
            Self::Storage => "storage",
            Self::Functions => "functions",
        })
    }
}

/// Internal error type. Every variant maps to exactly one [`SupabaseError`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied argument failed local validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The transport could not complete the exchange.
    #[error("network: {0}")]
    Network(String),

    /// The service answered with a non-2xx status.
    #[error("{service} ({status}): {message}")]
    Api {
        /// Which service answered.
        service: Service,
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The success payload does not fit the output buffer.
    #[error("result needs {required} bytes but the buffer holds {capacity}")]
    BufferTooSmall {
        /// Bytes needed, including the NUL terminator.
        required: usize,
        /// Capacity declared by the caller.
        capacity: usize,
    },

    /// A 2xx response body was not valid JSON.
    #[error("malformed {service} response: {reason}")]
    Decode {
        /// Which service answered.
        service: Service,
        /// Parser message.
        reason: String,
    },

    /// Any other internal failure.
    #[error("runtime: {0}")]
    Runtime(String),

    /// A panic was caught at the boundary.
    #[error("panic in {op}: {message}")]
    Panic {
        /// Exported function that panicked.
        op: &'static str,
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// The caller-facing code for this error.
    #[must_use]
    pub const fn code(&self) -> SupabaseError {
        match self {
            Self::InvalidInput(_) => SupabaseError::InvalidInput,
            Self::Network(_) => SupabaseError::NetworkError,
            Self::Api { service, .. } => service.error_code(),
            Self::BufferTooSmall { .. } => SupabaseError::BufferTooSmall,
            Self::Decode { .. } | Self::Runtime(_) => SupabaseError::RuntimeError,
            Self::Panic { .. } => SupabaseError::UnknownError,
        }
    }
}

impl From<&Error> for SupabaseError {
    fn from(e: &Error) -> Self {
        e.code()
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidInput(format!("url: {e}"))
    }
}
