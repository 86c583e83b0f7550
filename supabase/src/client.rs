//! Supabase client, the primary entry point for the SDK.

use std::ffi::{CStr, c_char};
use std::ptr;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use supabase_ffi::SupabaseError;
use supabase_ffi::auth::{supabase_auth_sign_in, supabase_auth_sign_out, supabase_auth_sign_up};
use supabase_ffi::client::{
    SupabaseClient, SupabaseClientOptions, supabase_client_error_sequence, supabase_client_free,
    supabase_client_is_authenticated, supabase_client_new_with_options,
};
use supabase_ffi::database::{supabase_database_insert, supabase_database_select};
use supabase_ffi::functions::supabase_functions_invoke;
use supabase_ffi::storage::supabase_storage_list_buckets;

use crate::error::{self, Error, Result};
use crate::ffi::{OwnedHandle, c_str_ptr, optional_c_string, to_c_string};
use crate::types::{Bucket, ErrorCode};

/// Initial result buffer size.
pub const DEFAULT_RESULT_CAPACITY: usize = 64 * 1024;

/// Largest result buffer a read will grow to.
pub const DEFAULT_MAX_RESULT_CAPACITY: usize = 16 * 1024 * 1024;

/// Initialize the library's tracing logger. Only the first call has an effect.
pub fn init_logger(level: Option<&str>) -> Result<()> {
    let c = optional_c_string(level)?;
    let rc = unsafe { supabase_ffi::supabase_init_logger(c_str_ptr(c.as_ref())) };
    if rc.is_ok() {
        Ok(())
    } else {
        Err(error::last_thread_error())
    }
}

/// Version of the underlying library.
#[must_use]
pub fn version() -> &'static str {
    unsafe { CStr::from_ptr(supabase_ffi::supabase_version()) }
        .to_str()
        .unwrap_or_default()
}

/// A configured connection to one Supabase project.
#[derive(Debug)]
pub struct Client {
    handle: OwnedHandle<SupabaseClient>,
    result_capacity: usize,
    max_result_capacity: usize,
}

impl Client {
    /// Create a new [`ClientBuilder`].
    #[must_use]
    pub fn builder(url: impl Into<String>, key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url, key)
    }

    /// Wrap an already configured library client, e.g. one with a custom transport.
    pub fn from_ffi(client: supabase_ffi::Client) -> Result<Self> {
        let handle = OwnedHandle::new(client.into_handle(), supabase_client_free)?;
        Ok(Self {
            handle,
            result_capacity: DEFAULT_RESULT_CAPACITY,
            max_result_capacity: DEFAULT_MAX_RESULT_CAPACITY,
        })
    }

    /// Sign in with email and password. The session is kept for later calls.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Value> {
        let email = to_c_string(email)?;
        let password = to_c_string(password)?;
        self.fetch(false, |out, len| unsafe {
            supabase_auth_sign_in(self.handle.as_mut_ptr(), email.as_ptr(), password.as_ptr(), out, len)
        })
    }

    /// Register a new user.
    pub fn sign_up(&self, email: &str, password: &str) -> Result<Value> {
        let email = to_c_string(email)?;
        let password = to_c_string(password)?;
        self.fetch(false, |out, len| unsafe {
            supabase_auth_sign_up(self.handle.as_mut_ptr(), email.as_ptr(), password.as_ptr(), out, len)
        })
    }

    /// Revoke the held session. The local session is dropped either way.
    pub fn sign_out(&self) -> Result<()> {
        let rc = unsafe { supabase_auth_sign_out(self.handle.as_mut_ptr()) };
        error::check(self.handle.as_ptr(), rc)
    }

    /// Whether a session is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        unsafe { supabase_client_is_authenticated(self.handle.as_ptr()) == 1 }
    }

    /// Select `columns` from `table` and deserialize the rows.
    ///
    /// Grows the result buffer and retries when the rows do not fit.
    pub fn select<T: DeserializeOwned>(&self, table: &str, columns: &str) -> Result<T> {
        let table = to_c_string(table)?;
        let columns = to_c_string(columns)?;
        let rows = self.fetch(true, |out, len| unsafe {
            supabase_database_select(self.handle.as_mut_ptr(), table.as_ptr(), columns.as_ptr(), out, len)
        })?;
        Ok(serde_json::from_value(rows)?)
    }

    /// Insert `rows` (one record or a list of records) and deserialize what was inserted.
    pub fn insert<B, T>(&self, table: &str, rows: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let table = to_c_string(table)?;
        let json = to_c_string(&serde_json::to_string(rows)?)?;
        let inserted = self.fetch(false, |out, len| unsafe {
            supabase_database_insert(self.handle.as_mut_ptr(), table.as_ptr(), json.as_ptr(), out, len)
        })?;
        Ok(serde_json::from_value(inserted)?)
    }

    /// List storage buckets.
    pub fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let buckets = self.fetch(true, |out, len| unsafe {
            supabase_storage_list_buckets(self.handle.as_mut_ptr(), out, len)
        })?;
        Ok(serde_json::from_value(buckets)?)
    }

    /// Invoke edge function `name` with an optional JSON body.
    pub fn invoke<T: DeserializeOwned>(&self, name: &str, body: Option<&Value>) -> Result<T> {
        let name = to_c_string(name)?;
        let body = body.map(|b| to_c_string(&b.to_string())).transpose()?;
        let reply = self.fetch(false, |out, len| unsafe {
            supabase_functions_invoke(
                self.handle.as_mut_ptr(),
                name.as_ptr(),
                c_str_ptr(body.as_ref()),
                out,
                len,
            )
        })?;
        Ok(serde_json::from_value(reply)?)
    }

    /// The error left by the most recent call, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<Error> {
        match error::last_client_error(self.handle.as_ptr()) {
            Error::Ffi { message, .. } if message.is_empty() => None,
            e => Some(e),
        }
    }

    /// Number of failures this client has recorded.
    #[must_use]
    pub fn error_sequence(&self) -> u64 {
        unsafe { supabase_client_error_sequence(self.handle.as_ptr()) }
    }

    /// Run `call` with a result buffer and parse what it wrote.
    ///
    /// With `grow`, a `BufferTooSmall` failure is retried with a larger buffer up
    /// to the configured maximum. Only idempotent reads pass `grow`.
    fn fetch(&self, grow: bool, call: impl Fn(*mut c_char, usize) -> SupabaseError) -> Result<Value> {
        let mut capacity = self.result_capacity;
        loop {
            let mut buf = vec![0_u8; capacity];
            let rc = call(buf.as_mut_ptr().cast(), buf.len());
            match error::check(self.handle.as_ptr(), rc) {
                Ok(()) => {
                    let text = CStr::from_bytes_until_nul(&buf).map_err(|_| Error::Ffi {
                        code: ErrorCode::Runtime,
                        message: "result is not NUL-terminated".into(),
                    })?;
                    return Ok(serde_json::from_slice(text.to_bytes())?);
                }
                Err(Error::Ffi {
                    code: ErrorCode::BufferTooSmall,
                    ..
                }) if grow && capacity < self.max_result_capacity => {
                    capacity = capacity.saturating_mul(4).min(self.max_result_capacity);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Builder for constructing a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    url: String,
    key: String,
    service_role_key: Option<String>,
    schema: Option<String>,
    timeout: Duration,
    connect_timeout: Duration,
    result_capacity: usize,
    max_result_capacity: usize,
}

impl ClientBuilder {
    /// Builder for project `url` with API key `key`.
    #[must_use]
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            service_role_key: None,
            schema: None,
            timeout: Duration::ZERO,
            connect_timeout: Duration::ZERO,
            result_capacity: DEFAULT_RESULT_CAPACITY,
            max_result_capacity: DEFAULT_MAX_RESULT_CAPACITY,
        }
    }

    /// Service-role key for admin-scoped calls.
    #[must_use]
    pub fn service_role_key(mut self, k: impl Into<String>) -> Self {
        self.service_role_key = Some(k.into());
        self
    }

    /// Postgres schema (default: `public`).
    #[must_use]
    pub fn schema(mut self, s: impl Into<String>) -> Self {
        self.schema = Some(s.into());
        self
    }

    /// Whole-request timeout (default: 60 s).
    #[must_use]
    pub const fn timeout(mut self, t: Duration) -> Self {
        self.timeout = t;
        self
    }

    /// Connect timeout (default: 10 s).
    #[must_use]
    pub const fn connect_timeout(mut self, t: Duration) -> Self {
        self.connect_timeout = t;
        self
    }

    /// Initial result buffer size in bytes.
    #[must_use]
    pub fn result_capacity(mut self, bytes: usize) -> Self {
        self.result_capacity = bytes.max(1);
        self
    }

    /// Largest result buffer a read may grow to.
    #[must_use]
    pub const fn max_result_capacity(mut self, bytes: usize) -> Self {
        self.max_result_capacity = bytes;
        self
    }

    /// Validate the settings and create the client. No network I/O happens.
    pub fn build(self) -> Result<Client> {
        let c_url = to_c_string(&self.url)?;
        let c_key = to_c_string(&self.key)?;
        let c_service = optional_c_string(self.service_role_key.as_deref())?;
        let c_schema = optional_c_string(self.schema.as_deref())?;

        let opts = SupabaseClientOptions {
            url: c_url.as_ptr(),
            key: c_key.as_ptr(),
            service_role_key: c_str_ptr(c_service.as_ref()),
            schema: c_str_ptr(c_schema.as_ref()),
            timeout_ms: millis(self.timeout),
            connect_timeout_ms: millis(self.connect_timeout),
        };

        let raw = unsafe { supabase_client_new_with_options(&raw const opts) };
        if raw.is_null() {
            return Err(error::last_thread_error());
        }
        Ok(Client {
            handle: OwnedHandle::new(raw, supabase_client_free)?,
            result_capacity: self.result_capacity,
            max_result_capacity: self.max_result_capacity.max(self.result_capacity),
        })
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_settings_surface_library_errors() {
        let err = Client::builder("ftp://example.com", "anon").build().unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidInput));
        assert!(err.to_string().contains("http or https"), "{err}");

        let err = Client::builder("http://localhost", "a\0b").build().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn fresh_client_has_no_error_or_session() {
        let client = Client::builder("http://localhost:54321", "anon")
            .schema("app")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        assert!(!client.is_authenticated());
        assert!(client.last_error().is_none());
        assert_eq!(client.error_sequence(), 0);
        // Without a session sign-out never touches the network.
        client.sign_out().unwrap();
    }

    #[test]
    fn version_matches_library() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
