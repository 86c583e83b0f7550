//! HTTP exchange seam. The client builds [`Request`]s; a [`Transport`] runs them.

use std::fmt;

use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// HTTP methods the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

/// A fully built request.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including query.
    pub url: Url,
    /// Header name/value pairs, in send order.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<String>,
}

impl Request {
    /// Value of the first header named `name` (ASCII case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl Response {
    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Runs one request to completion.
///
/// Implementations return `Ok` for every HTTP response, whatever the status, and
/// [`Error::Network`] only when no response was obtained. A body over the
/// configured cap is [`Error::Runtime`].
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send `request` and wait for the response.
    fn send(&self, request: &Request) -> Result<Response>;
}

/// Blocking transport over a `ureq` agent.
pub struct HttpTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl HttpTransport {
    /// Build an agent with the config's timeouts and response cap.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.request_timeout()))
            .timeout_connect(Some(config.connection_timeout()))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            body_limit: config.response_limit(),
        }
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let url = request.url.as_str();
        let sent = match request.method {
            Method::Get => {
                let mut builder = self.agent.get(url);
                for (k, v) in &request.headers {
                    builder = builder.header(k.as_str(), v.as_str());
                }
                builder.call()
            }
            Method::Post => {
                let mut builder = self.agent.post(url);
                for (k, v) in &request.headers {
                    builder = builder.header(k.as_str(), v.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_str()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = sent.map_err(|e| Error::Network(format!("{url}: {e}")))?;
        let status = response.status().as_u16();
        let limit = self.body_limit;
        let body = response
            .body_mut()
            .with_config()
            .limit(limit)
            .read_to_string()
            .map_err(|e| match e {
                // The server answered; the answer is just too big to hold.
                ureq::Error::BodyExceedsLimit(_) => {
                    Error::Runtime(format!("{url}: response body exceeds {limit} bytes"))
                }
                e => Error::Network(format!("{url}: reading body: {e}")),
            })?;
        Ok(Response { status, body })
    }
}
