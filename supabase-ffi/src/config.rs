//! Client configuration and its validation.

use std::fmt;
use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Request timeout used when the caller passes 0.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connect timeout used when the caller passes 0.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest response body read when the caller does not pick a limit.
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Schema used when the caller does not pick one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Everything a client handle needs to talk to one project.
#[derive(Clone)]
pub struct ClientConfig {
    url: Url,
    key: Zeroizing<String>,
    service_role_key: Option<Zeroizing<String>>,
    schema: String,
    timeout: Duration,
    connect_timeout: Duration,
    max_response_bytes: u64,
    default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Validate `url` and `key` and build a config with defaults.
    ///
    /// The URL must use `http` or `https` and name a host. The key must be
    /// non-blank and free of control characters (it travels in a header).
    pub fn new(url: &str, key: &str) -> Result<Self> {
        let url = parse_project_url(url)?;
        let key = header_secret("key", key)?;
        Ok(Self {
            url,
            key,
            service_role_key: None,
            schema: DEFAULT_SCHEMA.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            default_headers: Vec::new(),
        })
    }

    /// Use a service-role key for admin-scoped calls (storage bucket listing).
    pub fn service_role_key(mut self, key: &str) -> Result<Self> {
        self.service_role_key = Some(header_secret("service role key", key)?);
        Ok(self)
    }

    /// Postgres schema for database calls.
    pub fn schema(mut self, schema: &str) -> Result<Self> {
        let schema = schema.trim();
        if schema.is_empty() {
            return Err(Error::invalid("schema is blank"));
        }
        if schema.chars().any(char::is_control) {
            return Err(Error::invalid("schema contains control characters"));
        }
        schema.clone_into(&mut self.schema);
        Ok(self)
    }

    /// Whole-request timeout. Zero keeps the default.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    /// Connect timeout. Zero keeps the default.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.connect_timeout = timeout;
        }
        self
    }

    /// Cap on response body size. Larger bodies fail with `RuntimeError`.
    /// Zero keeps the default.
    #[must_use]
    pub const fn max_response_bytes(mut self, limit: u64) -> Self {
        if limit != 0 {
            self.max_response_bytes = limit;
        }
        self
    }

    /// Extra header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Project base URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Anon (or publishable) API key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key for admin-scoped calls: the service-role key if set, else the API key.
    #[must_use]
    pub fn admin_key(&self) -> &str {
        self.service_role_key.as_deref().map_or(self.key(), String::as_str)
    }

    /// Database schema.
    #[must_use]
    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// Whole-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.timeout
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Response body cap in bytes.
    #[must_use]
    pub const fn response_limit(&self) -> u64 {
        self.max_response_bytes
    }

    /// Extra headers sent with every request.
    #[must_use]
    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// Build an endpoint URL by appending percent-encoded path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::invalid("project url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url.as_str())
            .field("key", &"<redacted>")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "<redacted>"),
            )
            .field("schema", &self.schema)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("default_headers", &self.default_headers.len())
            .finish()
    }
}

fn parse_project_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::invalid("url is blank"));
    }
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid(format!(
            "url scheme must be http or https, got {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::invalid("url has no host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::invalid("url must not carry a query or fragment"));
    }
    Ok(url)
}

fn header_secret(what: &str, raw: &str) -> Result<Zeroizing<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid(format!("{what} is blank")));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(Error::invalid(format!("{what} contains control characters")));
    }
    Ok(Zeroizing::new(trimmed.to_owned()))
}
