//! `supabase-ffi`: C ABI for a Supabase client.
//!
//! Design principles:
//! - Every fallible function returns a [`SupabaseError`] code (`0` = success).
//! - A client is an opaque `Box<SupabaseClient>` behind `*mut SupabaseClient`,
//!   released with [`supabase_client_free`](client::supabase_client_free).
//! - Results are compact JSON written into a caller-owned buffer, NUL-terminated.
//!   A result that does not fit fails with `SUPABASE_BUFFER_TOO_SMALL` and the
//!   buffer is left untouched.
//! - The last error is kept per handle and per calling thread. Both are reset at
//!   the start of every call.
//! - Network calls are blocking. A panic never crosses the boundary.

#![allow(unsafe_code)]

mod buffer;
mod ffi;

pub mod auth;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod functions;
pub mod state;
pub mod storage;
pub mod transport;

pub use client::{Client, SupabaseClient, SupabaseClientOptions};
pub use config::ClientConfig;
pub use error::{Error, Result, Service, SupabaseError};
pub use ffi::{
    supabase_clear_last_error, supabase_get_last_error, supabase_init_logger,
    supabase_last_error_length, supabase_last_error_sequence, supabase_version,
};
