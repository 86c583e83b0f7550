//! SDK types: error codes and typed service payloads.

use serde::{Deserialize, Serialize};

macro_rules! ffi_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$vm:meta])* $variant:ident = $val:expr),* $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name { $($(#[$vm])* $variant = $val),* }

        impl $name {
            /// Convert from FFI `i32`. Returns `None` for unknown values.
            #[must_use]
            pub const fn from_ffi(v: i32) -> Option<Self> {
                match v { $($val => Some(Self::$variant),)* _ => None }
            }
        }
    };
}

ffi_enum! {
    /// Failure category reported by the library. Values match `SupabaseError`.
    pub enum ErrorCode {
        /// A malformed or missing argument.
        InvalidInput = 1,
        /// No HTTP response was obtained.
        Network = 2,
        /// Rejected by the auth service.
        Auth = 3,
        /// Rejected by the database (PostgREST).
        Database = 4,
        /// Rejected by the storage service.
        Storage = 5,
        /// An edge function failed.
        Functions = 6,
        /// Realtime failure (reserved).
        Realtime = 7,
        /// Internal failure, such as an unparseable response.
        Runtime = 8,
        /// The result did not fit the result buffer.
        BufferTooSmall = 9,
        /// Unexpected failure.
        Unknown = 99,
    }
}

impl From<supabase_ffi::SupabaseError> for ErrorCode {
    fn from(e: supabase_ffi::SupabaseError) -> Self {
        Self::from_ffi(e as i32).unwrap_or(Self::Unknown)
    }
}

/// A storage bucket as returned by `list_buckets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether objects are readable without auth.
    #[serde(default)]
    pub public: bool,
    /// Owning user, if any.
    #[serde(default)]
    pub owner: Option<String>,
    /// Max object size in bytes, if limited.
    #[serde(default)]
    pub file_size_limit: Option<u64>,
    /// Allowed MIME types, if restricted.
    #[serde(default)]
    pub allowed_mime_types: Option<Vec<String>>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
}
