//! Handle creation, release and the real HTTP transport.

mod common;

use std::ffi::CStr;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::ptr;
use std::thread;

use common::*;
use supabase_ffi::client::{
    supabase_client_free, supabase_client_is_authenticated, supabase_client_last_error,
    supabase_client_new, supabase_client_new_with_options,
};
use supabase_ffi::auth::supabase_auth_sign_in;
use supabase_ffi::database::supabase_database_select;
use supabase_ffi::{
    Client, ClientConfig, SupabaseClientOptions, SupabaseError, supabase_get_last_error,
    supabase_version,
};

fn options(url: &std::ffi::CString, key: &std::ffi::CString) -> SupabaseClientOptions {
    SupabaseClientOptions {
        url: url.as_ptr(),
        key: key.as_ptr(),
        service_role_key: ptr::null(),
        schema: ptr::null(),
        timeout_ms: 0,
        connect_timeout_ms: 0,
    }
}

#[test]
fn invalid_construction_returns_null() {
    let good_url = c(URL);
    let key = c(ANON_KEY);
    let not_a_url = c("not a url");
    let ftp = c("ftp://example.com");
    let blank = c("   ");
    let cases = [
        (ptr::null(), key.as_ptr()),
        (good_url.as_ptr(), ptr::null()),
        (not_a_url.as_ptr(), key.as_ptr()),
        (ftp.as_ptr(), key.as_ptr()),
        (good_url.as_ptr(), blank.as_ptr()),
    ];
    for (url, key) in cases {
        let handle = unsafe { supabase_client_new(url, key) };
        assert!(handle.is_null());
        let (code, message) = thread_error();
        assert_eq!(code, SupabaseError::InvalidInput);
        assert!(!message.is_empty());
    }

    assert!(unsafe { supabase_client_new_with_options(ptr::null()) }.is_null());
    assert_eq!(thread_error().0, SupabaseError::InvalidInput);
}

#[test]
fn valid_construction_does_no_io() {
    let url = c("https://unreachable.invalid");
    let key = c(ANON_KEY);
    let handle = unsafe { supabase_client_new(url.as_ptr(), key.as_ptr()) };
    assert!(!handle.is_null());
    assert_eq!(thread_error(), (SupabaseError::Success, String::new()));
    assert_eq!(unsafe { supabase_client_is_authenticated(handle) }, 0);
    unsafe { supabase_client_free(handle) };
}

#[test]
fn options_are_validated() {
    let url = c(URL);
    let key = c(ANON_KEY);
    let schema = c("bad\nschema");
    let mut opts = options(&url, &key);
    opts.schema = schema.as_ptr();
    assert!(unsafe { supabase_client_new_with_options(&raw const opts) }.is_null());

    let schema = c("analytics");
    let service = c("service-key");
    opts.schema = schema.as_ptr();
    opts.service_role_key = service.as_ptr();
    opts.timeout_ms = 1500;
    let handle = unsafe { supabase_client_new_with_options(&raw const opts) };
    assert!(!handle.is_null());
    unsafe { supabase_client_free(handle) };
}

#[test]
fn null_handles_are_tolerated() {
    unsafe { supabase_client_free(ptr::null_mut()) };
    assert_eq!(unsafe { supabase_client_is_authenticated(ptr::null()) }, -1);
    let mut buf = [0xAA_u8; 8];
    let code = unsafe { supabase_client_last_error(ptr::null(), out_ptr(&mut buf), buf.len()) };
    assert_eq!(code, SupabaseError::InvalidInput);
    assert_eq!(buf, [0xAA; 8]);
}

#[test]
fn version_is_the_crate_version() {
    let v = unsafe { CStr::from_ptr(supabase_version()) };
    assert_eq!(v.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
}

#[test]
fn unreachable_host_is_a_network_error() {
    let url = c("http://127.0.0.1:1");
    let key = c(ANON_KEY);
    let mut opts = options(&url, &key);
    opts.timeout_ms = 5000;
    opts.connect_timeout_ms = 2000;
    let handle = unsafe { supabase_client_new_with_options(&raw const opts) };
    assert!(!handle.is_null());

    let table = c("todos");
    let mut out = [0xAA_u8; 64];
    let code = unsafe {
        supabase_database_select(handle, table.as_ptr(), ptr::null(), out_ptr(&mut out), out.len())
    };
    assert_eq!(code, SupabaseError::NetworkError);
    assert_eq!(out, [0xAA; 64]);

    let mut msg = [0_u8; 512];
    let code = unsafe { supabase_client_last_error(handle, out_ptr(&mut msg), msg.len()) };
    assert_eq!(code, SupabaseError::NetworkError);
    assert!(!buf_str(&msg).is_empty());
    assert_eq!(thread_error().0, SupabaseError::NetworkError);
    unsafe { supabase_client_free(handle) };
}

#[test]
fn sign_in_against_an_unreachable_host_reports_through_the_thread_scope() {
    let url = c("http://127.0.0.1:1");
    let key = c(ANON_KEY);
    let mut opts = options(&url, &key);
    opts.timeout_ms = 5000;
    opts.connect_timeout_ms = 2000;
    let handle = unsafe { supabase_client_new_with_options(&raw const opts) };
    assert!(!handle.is_null());

    let email = c("test@example.com");
    let password = c("password123");
    let mut out = [0xAA_u8; 256];
    let code = unsafe {
        supabase_auth_sign_in(handle, email.as_ptr(), password.as_ptr(), out_ptr(&mut out), out.len())
    };
    assert_eq!(code, SupabaseError::NetworkError);
    assert_eq!(out, [0xAA; 256]);
    assert_eq!(unsafe { supabase_client_is_authenticated(handle) }, 0);

    let mut msg = [0_u8; 512];
    let stored = unsafe { supabase_get_last_error(out_ptr(&mut msg), msg.len()) };
    assert_eq!(stored, SupabaseError::NetworkError);
    assert!(buf_str(&msg).starts_with("network: "), "{}", buf_str(&msg));
    unsafe { supabase_client_free(handle) };
}

/// Serve one HTTP exchange on a fresh port and return the request head lines.
fn serve_once(body: String) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut head = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            head.push(line.trim_end().to_owned());
        }
        let mut stream = stream;
        // The client may hang up early when the body is over its cap.
        let _ = write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let _ = stream.write_all(body.as_bytes());
        let _ = stream.flush();
        head
    });
    (format!("http://{addr}"), server)
}

#[test]
fn http_transport_talks_to_a_real_socket() {
    let (base, server) = serve_once(r#"[{"id":1}]"#.to_owned());

    let url = c(&base);
    let key = c(ANON_KEY);
    let handle = unsafe { supabase_client_new(url.as_ptr(), key.as_ptr()) };
    let table = c("todos");
    let mut out = [0_u8; 64];
    let code = unsafe {
        supabase_database_select(handle, table.as_ptr(), ptr::null(), out_ptr(&mut out), out.len())
    };
    unsafe { supabase_client_free(handle) };

    let head = server.join().unwrap();
    assert_eq!(code, SupabaseError::Success);
    assert_eq!(buf_str(&out), r#"[{"id":1}]"#);
    assert!(head[0].starts_with("GET /rest/v1/todos?select=* HTTP/1.1"), "{}", head[0]);
    assert!(head.iter().any(|h| h.eq_ignore_ascii_case("apikey: anon-key")));
}

#[test]
fn bodies_past_ten_mebibytes_are_read_in_full() {
    let pad = "a".repeat(100);
    let rows: Vec<String> = (0..100_000)
        .map(|i| format!(r#"{{"id":{i},"pad":"{pad}"}}"#))
        .collect();
    let body = format!("[{}]", rows.join(","));
    assert!(body.len() > 10 * 1024 * 1024);
    let expected_len = body.len();
    let (base, server) = serve_once(body);

    let url = c(&base);
    let key = c(ANON_KEY);
    let handle = unsafe { supabase_client_new(url.as_ptr(), key.as_ptr()) };
    let table = c("todos");
    let mut out = vec![0_u8; 16 * 1024 * 1024];
    let code = unsafe {
        supabase_database_select(handle, table.as_ptr(), ptr::null(), out_ptr(&mut out), out.len())
    };
    let error = {
        let mut msg = [0_u8; 512];
        unsafe { supabase_client_last_error(handle, out_ptr(&mut msg), msg.len()) };
        buf_str(&msg).to_owned()
    };
    unsafe { supabase_client_free(handle) };
    server.join().unwrap();

    assert_eq!(code, SupabaseError::Success, "{error}");
    let text = buf_str(&out);
    assert_eq!(text.len(), expected_len);
    assert!(text.starts_with(r#"[{"id":0,"pad":"aaaa"#));
}

#[test]
fn bodies_over_the_cap_are_runtime_errors() {
    let (base, server) = serve_once(format!(r#"["{}"]"#, "x".repeat(4096)));

    let config = ClientConfig::new(&base, ANON_KEY).unwrap().max_response_bytes(1024);
    let handle = Client::new(config).into_handle();
    let table = c("todos");
    let mut out = [0xAA_u8; 64];
    let code = unsafe {
        supabase_database_select(handle, table.as_ptr(), ptr::null(), out_ptr(&mut out), out.len())
    };
    let mut msg = [0_u8; 512];
    let stored = unsafe { supabase_client_last_error(handle, out_ptr(&mut msg), msg.len()) };
    unsafe { supabase_client_free(handle) };
    server.join().unwrap();

    assert_eq!(code, SupabaseError::RuntimeError);
    assert_eq!(stored, SupabaseError::RuntimeError);
    assert!(buf_str(&msg).contains("exceeds 1024 bytes"), "{}", buf_str(&msg));
    assert_eq!(out, [0xAA; 64]);
}
