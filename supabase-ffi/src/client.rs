//! Client lifecycle, request plumbing, and the handle-scoped error accessors.

use std::ffi::c_char;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use url::Url;
use zeroize::Zeroizing;

use crate::config::ClientConfig;
use crate::error::{Error, Result, Service, SupabaseError};
use crate::ffi::*;
use crate::state::ErrorState;
use crate::transport::{HttpTransport, Method, Request, Response, Transport};

/// Value of the `X-Client-Info` header.
const CLIENT_INFO: &str = concat!("supabase-ffi/", env!("CARGO_PKG_VERSION"));

/// Which credentials a request is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Credential<'a> {
    /// API key as both `apikey` and bearer token.
    Anon,
    /// API key, with the signed-in session's token as bearer when there is one.
    User,
    /// Service-role key if configured, else the API key.
    Admin,
    /// API key, with an explicit bearer token.
    Bearer(&'a str),
}

/// A configured connection to one project. Owned by a [`SupabaseClient`] handle.
pub struct Client {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    session: Mutex<Option<Zeroizing<String>>>,
}

impl Client {
    /// Client over the default HTTP transport. No I/O happens here.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let transport = HttpTransport::new(&config);
        Self::with_transport(config, Box::new(transport))
    }

    /// Client over a caller-provided transport.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            session: Mutex::new(None),
        }
    }

    /// Move the client behind a new opaque handle. Free with [`supabase_client_free`].
    #[must_use]
    pub fn into_handle(self) -> *mut SupabaseClient {
        into_raw(SupabaseClient {
            inner: self,
            errors: Mutex::new(ErrorState::default()),
        })
    }

    /// The client's configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a session token from sign-in or sign-up is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Keep the access token from an auth response, if it carries one.
    pub(crate) fn store_session(&self, response: &Value) {
        let scope = response
            .get("session")
            .filter(|s| s.is_object())
            .unwrap_or(response);
        if let Some(token) = scope.get("access_token").and_then(Value::as_str) {
            *self.session.lock() = Some(Zeroizing::new(token.to_owned()));
        }
    }

    /// Drop the held session and return it.
    pub(crate) fn take_session(&self) -> Option<Zeroizing<String>> {
        self.session.lock().take()
    }

    /// Send a request and require a 2xx answer.
    pub(crate) fn exchange(
        &self,
        service: Service,
        method: Method,
        url: Url,
        body: Option<String>,
        extra_headers: &[(&str, &str)],
        credential: Credential<'_>,
    ) -> Result<Response> {
        let (key, bearer) = match credential {
            Credential::Anon => (self.config.key(), Zeroizing::new(self.config.key().to_owned())),
            Credential::Admin => (
                self.config.admin_key(),
                Zeroizing::new(self.config.admin_key().to_owned()),
            ),
            Credential::Bearer(token) => (self.config.key(), Zeroizing::new(token.to_owned())),
            Credential::User => {
                let bearer = self
                    .session
                    .lock()
                    .clone()
                    .unwrap_or_else(|| Zeroizing::new(self.config.key().to_owned()));
                (self.config.key(), bearer)
            }
        };

        let mut headers: Vec<(String, String)> = vec![
            ("apikey".into(), key.to_owned()),
            ("Authorization".into(), format!("Bearer {}", bearer.as_str())),
            ("X-Client-Info".into(), CLIENT_INFO.into()),
        ];
        if body.is_some() {
            headers.push(("Content-Type".into(), "application/json".into()));
        }
        headers.extend(self.config.default_headers().iter().cloned());
        headers.extend(
            extra_headers
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned())),
        );

        let request = Request {
            method,
            url,
            headers,
            body,
        };
        debug!(%service, ?method, path = request.url.path(), "sending request");
        let response = self.transport.send(&request)?;
        debug!(%service, status = response.status, "received response");

        if response.is_success() {
            Ok(response)
        } else {
            Err(Error::Api {
                service,
                status: response.status,
                message: api_error_message(&response),
            })
        }
    }

    /// [`exchange`](Self::exchange) and parse the body as JSON.
    pub(crate) fn call(
        &self,
        service: Service,
        method: Method,
        url: Url,
        body: Option<String>,
        extra_headers: &[(&str, &str)],
        credential: Credential<'_>,
    ) -> Result<Value> {
        let response = self.exchange(service, method, url, body, extra_headers, credential)?;
        parse_json(service, &response.body)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Parse a 2xx body. An empty body is `null`.
pub(crate) fn parse_json(service: Service, body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| Error::Decode {
        service,
        reason: e.to_string(),
    })
}

/// Best human-readable message from an error response.
///
/// PostgREST and storage use `message`, GoTrue uses `msg` or
/// `error_description`, some gateways only send `error`.
pub(crate) fn api_error_message(response: &Response) -> String {
    let body = response.body.trim();
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        for field in ["message", "msg", "error_description", "error"] {
            if let Some(msg) = obj.get(field).and_then(Value::as_str) {
                if !msg.is_empty() {
                    return msg.to_owned();
                }
            }
        }
    }
    if body.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        body.to_owned()
    }
}

// ---------------------------------------------------------------------------
// Opaque handle
// ---------------------------------------------------------------------------

/// Opaque client handle exposed to C.
///
/// A handle is not safe for concurrent calls from several threads; callers
/// serialize access to one handle. Distinct handles are independent.
#[derive(Debug)]
pub struct SupabaseClient {
    pub(crate) inner: Client,
    pub(crate) errors: Mutex<ErrorState>,
}

/// Options for [`supabase_client_new_with_options`]. Strings are borrowed.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SupabaseClientOptions {
    /// Project URL (required).
    pub url: *const c_char,
    /// Anon or publishable API key (required).
    pub key: *const c_char,
    /// Service-role key for admin calls. Null = none.
    pub service_role_key: *const c_char,
    /// Postgres schema. Null = "public".
    pub schema: *const c_char,
    /// Whole-request timeout in milliseconds. 0 = 60 s.
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds. 0 = 10 s.
    pub connect_timeout_ms: u64,
}

/// Validate a config inside `run_unbound` and box a client for it.
fn create(op: &'static str, build: impl FnOnce() -> Result<ClientConfig>) -> *mut SupabaseClient {
    let mut out = std::ptr::null_mut();
    run_unbound(op, || {
        let config = build()?;
        debug!(url = config.url().as_str(), "creating client");
        out = Client::new(config).into_handle();
        Ok(())
    });
    out
}

/// Create a client for `url` using API key `key`. No network I/O happens.
///
/// Returns null on invalid input; [`supabase_get_last_error`] then reports
/// `SUPABASE_INVALID_INPUT`. Free the handle with [`supabase_client_free`].
///
/// # Safety
///
/// `url` and `key` must be null or valid C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_client_new(
    url: *const c_char,
    key: *const c_char,
) -> *mut SupabaseClient {
    create("supabase_client_new", || {
        let url = unsafe { c_str_arg(url, "url")? };
        let key = unsafe { c_str_arg(key, "key")? };
        ClientConfig::new(url, key)
    })
}

/// Create a client from an options struct. Same contract as [`supabase_client_new`].
///
/// # Safety
///
/// `opts` must be null or point to a valid [`SupabaseClientOptions`] whose
/// string fields are null or valid C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_client_new_with_options(
    opts: *const SupabaseClientOptions,
) -> *mut SupabaseClient {
    create("supabase_client_new_with_options", || {
        let opts = unsafe { opts.as_ref() }.ok_or_else(|| Error::invalid("null options"))?;
        let url = unsafe { c_str_arg(opts.url, "url")? };
        let key = unsafe { c_str_arg(opts.key, "key")? };
        let mut config = ClientConfig::new(url, key)?
            .timeout(Duration::from_millis(opts.timeout_ms))
            .connect_timeout(Duration::from_millis(opts.connect_timeout_ms));
        if let Some(k) = unsafe { c_str_opt(opts.service_role_key, "service_role_key")? } {
            config = config.service_role_key(k)?;
        }
        if let Some(s) = unsafe { c_str_opt(opts.schema, "schema")? } {
            config = config.schema(s)?;
        }
        Ok(config)
    })
}

/// Free a client handle and everything it owns. Null is a no-op.
///
/// # Safety
///
/// `client` must be null or a handle from `supabase_client_new*` that has not
/// been freed. Freeing twice, or using the handle afterwards, is undefined behavior.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_client_free(client: *mut SupabaseClient) {
    if !client.is_null() {
        drop(unsafe { Box::from_raw(client) });
    }
}

/// Copy this handle's last error message into `buffer` and return its code.
///
/// Same copy rules as [`supabase_get_last_error`]. Returns
/// `SUPABASE_INVALID_INPUT` without writing if `client` is null.
///
/// # Safety
///
/// `client` must be null or a live handle; `buffer` must be null or valid for
/// `buffer_len` bytes of writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_client_last_error(
    client: *const SupabaseClient,
    buffer: *mut c_char,
    buffer_len: usize,
) -> SupabaseError {
    match unsafe { client.as_ref() } {
        Some(h) => unsafe { h.errors.lock().copy_out(buffer, buffer_len) },
        None => SupabaseError::InvalidInput,
    }
}

/// Number of failures recorded on this handle so far. 0 for a null handle.
///
/// # Safety
///
/// `client` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_client_error_sequence(client: *const SupabaseClient) -> u64 {
    unsafe { client.as_ref() }.map_or(0, |h| h.errors.lock().sequence())
}

/// Forget this handle's last error.
///
/// # Safety
///
/// `client` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_client_clear_error(client: *const SupabaseClient) {
    if let Some(h) = unsafe { client.as_ref() } {
        h.errors.lock().reset();
    }
}

/// Whether the handle holds a session. Returns 1 = yes, 0 = no, -1 = null handle.
///
/// # Safety
///
/// `client` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_client_is_authenticated(client: *const SupabaseClient) -> i32 {
    unsafe { client.as_ref() }.map_or(-1, |h| i32::from(h.inner.is_authenticated()))
}
