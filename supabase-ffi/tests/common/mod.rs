//! Shared fixtures: a scripted in-memory transport and handle helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::ffi::{CStr, CString, c_char};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use supabase_ffi::client::supabase_client_free;
use supabase_ffi::transport::{Request, Response, Transport};
use supabase_ffi::{Client, ClientConfig, Error, Result, SupabaseClient, SupabaseError};

pub const URL: &str = "http://localhost:54321";
pub const ANON_KEY: &str = "anon-key";

type Handler = Box<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

#[derive(Default)]
struct Inner {
    queue: Mutex<VecDeque<Result<Response>>>,
    handler: Option<Handler>,
    requests: Mutex<Vec<Request>>,
}

/// A transport that records every request and answers from a script.
///
/// Queued replies are used first; then the handler, if any. With neither, the
/// exchange fails as a network error.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Inner>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(f: impl Fn(&Request) -> Result<Response> + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                handler: Some(Box::new(f)),
                ..Inner::default()
            }),
        }
    }

    /// Queue an HTTP reply.
    pub fn reply(&self, status: u16, body: &str) -> &Self {
        self.inner.queue.lock().push_back(Ok(Response {
            status,
            body: body.into(),
        }));
        self
    }

    /// Queue a transport failure.
    pub fn fail(&self, message: &str) -> &Self {
        self.inner
            .queue
            .lock()
            .push_back(Err(Error::Network(message.into())));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.requests.lock().clone()
    }

    pub fn last_request(&self) -> Request {
        self.inner
            .requests
            .lock()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport")
            .field("sent", &self.inner.requests.lock().len())
            .finish_non_exhaustive()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        self.inner.requests.lock().push(request.clone());
        if let Some(queued) = self.inner.queue.lock().pop_front() {
            return queued;
        }
        match &self.inner.handler {
            Some(handler) => handler(request),
            None => Err(Error::Network("no scripted reply".into())),
        }
    }
}

/// Owns a handle and frees it on drop.
#[derive(Debug)]
pub struct Handle(pub *mut SupabaseClient);

impl Handle {
    pub fn new(config: ClientConfig, transport: &FakeTransport) -> Self {
        Self(Client::with_transport(config, Box::new(transport.clone())).into_handle())
    }

    pub fn fake(transport: &FakeTransport) -> Self {
        Self::new(default_config(), transport)
    }

    pub fn ptr(&self) -> *mut SupabaseClient {
        self.0
    }

    /// The handle's last error code and message.
    pub fn last_error(&self) -> (SupabaseError, String) {
        let mut buf = [0_u8; 2048];
        let code = unsafe {
            supabase_ffi::client::supabase_client_last_error(
                self.0,
                buf.as_mut_ptr().cast(),
                buf.len(),
            )
        };
        (code, buf_str(&buf).to_owned())
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe { supabase_client_free(self.0) };
    }
}

// Handles are moved into worker threads in the concurrency tests; each is used
// by one thread at a time.
unsafe impl Send for Handle {}

pub fn default_config() -> ClientConfig {
    ClientConfig::new(URL, ANON_KEY).unwrap()
}

pub fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

/// Text up to the first NUL.
pub fn buf_str(buf: &[u8]) -> &str {
    CStr::from_bytes_until_nul(buf).unwrap().to_str().unwrap()
}

pub fn buf_json(buf: &[u8]) -> serde_json::Value {
    serde_json::from_str(buf_str(buf)).unwrap()
}

/// The calling thread's last error code and message.
pub fn thread_error() -> (SupabaseError, String) {
    let mut buf = [0_u8; 2048];
    let code = unsafe { supabase_ffi::supabase_get_last_error(buf.as_mut_ptr().cast(), buf.len()) };
    (code, buf_str(&buf).to_owned())
}

pub fn out_ptr(buf: &mut [u8]) -> *mut c_char {
    buf.as_mut_ptr().cast()
}
