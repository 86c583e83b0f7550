//! SDK behavior over a scripted transport.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use supabase::{Client, Error, ErrorCode};
use supabase_ffi::ClientConfig;
use supabase_ffi::transport::{Request, Response, Transport};

#[derive(Debug, Clone, Default)]
struct Script {
    replies: Arc<Mutex<VecDeque<(u16, String)>>>,
    sent: Arc<Mutex<Vec<Request>>>,
}

impl Script {
    fn reply(&self, status: u16, body: impl Into<String>) -> &Self {
        self.replies.lock().push_back((status, body.into()));
        self
    }

    fn sent(&self) -> Vec<Request> {
        self.sent.lock().clone()
    }
}

impl Transport for Script {
    fn send(&self, request: &Request) -> supabase_ffi::Result<Response> {
        self.sent.lock().push(request.clone());
        let (status, body) = self
            .replies
            .lock()
            .pop_front()
            .ok_or_else(|| supabase_ffi::Error::Network("no scripted reply".into()))?;
        Ok(Response { status, body })
    }
}

fn client(script: &Script) -> Client {
    let config = ClientConfig::new("http://localhost:54321", "anon").unwrap();
    Client::from_ffi(supabase_ffi::Client::with_transport(config, Box::new(script.clone()))).unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct Todo {
    id: i64,
    title: String,
}

#[test]
fn select_deserializes_rows() {
    let script = Script::default();
    script.reply(200, r#"[{"id":1,"title":"a"},{"id":2,"title":"b"}]"#);
    let client = client(&script);

    let todos: Vec<Todo> = client.select("todos", "id,title").unwrap();
    assert_eq!(todos.len(), 2);
    assert_eq!(todos[1], Todo { id: 2, title: "b".into() });
    assert!(client.last_error().is_none());
}

#[test]
fn large_reads_grow_the_buffer() {
    let script = Script::default();
    let big: Vec<_> = (0..5_000).map(|i| json!({ "id": i, "title": "x".repeat(8) })).collect();
    let body = serde_json::to_string(&big).unwrap();
    // The first attempt overflows the default buffer; the retry gets the same rows.
    script.reply(200, body.clone()).reply(200, body);
    let client = client(&script);

    let todos: Vec<Todo> = client.select("todos", "*").unwrap();
    assert_eq!(todos.len(), 5_000);
    assert_eq!(script.sent().len(), 2);
}

#[test]
fn writes_are_not_retried_on_overflow() {
    let script = Script::default();
    let rows: Vec<_> = (0..20_000).map(|i| json!({ "id": i, "title": "y" })).collect();
    script.reply(201, serde_json::to_string(&rows).unwrap());
    let client = client(&script);

    let err = client
        .insert::<_, Vec<Todo>>("todos", &json!({ "title": "y" }))
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::BufferTooSmall));
    assert_eq!(script.sent().len(), 1);
}

#[test]
fn service_failures_carry_code_and_message() {
    let script = Script::default();
    script.reply(400, r#"{"error_description":"Invalid login credentials"}"#);
    let client = client(&script);

    let err = client.sign_in("a@example.com", "wrong").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Auth));
    assert_eq!(err.to_string(), "auth (400): Invalid login credentials");
    assert_eq!(client.last_error().and_then(|e| e.code()), Some(ErrorCode::Auth));
    assert_eq!(client.error_sequence(), 1);
    assert!(!client.is_authenticated());
}

#[test]
fn session_round_trip() {
    let script = Script::default();
    script
        .reply(200, r#"{"access_token":"jwt","user":{"id":"u1"}}"#)
        .reply(200, "{}");
    let client = client(&script);

    let auth = client.sign_in("a@example.com", "right").unwrap();
    assert_eq!(auth["user"]["id"], "u1");
    assert!(client.is_authenticated());
    client.sign_out().unwrap();
    assert!(!client.is_authenticated());
    assert_eq!(
        script.sent()[1].header("authorization"),
        Some("Bearer jwt")
    );
}

#[test]
fn buckets_and_functions() {
    let script = Script::default();
    script
        .reply(200, r#"[{"id":"avatars","name":"avatars","public":false}]"#)
        .reply(200, r#"{"ok":true}"#);
    let client = client(&script);

    let buckets = client.list_buckets().unwrap();
    assert_eq!(buckets[0].name, "avatars");
    assert!(!buckets[0].public);

    let reply: serde_json::Value = client.invoke("ping", Some(&json!({ "n": 1 }))).unwrap();
    assert_eq!(reply, json!({ "ok": true }));
}

#[test]
fn nul_in_arguments_is_rejected_locally() {
    let script = Script::default();
    let client = client(&script);
    let err = client.select::<serde_json::Value>("to\0dos", "*").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(script.sent().is_empty());
}

#[test]
fn mismatched_shape_is_a_json_error() {
    let script = Script::default();
    script.reply(200, r#"{"not":"a list"}"#);
    let client = client(&script);
    let err = client.select::<Vec<Todo>>("todos", "*").unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}
