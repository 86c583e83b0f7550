#![doc = include_str!("../README.md")]
#![allow(unsafe_code)]

pub mod client;
pub mod error;
pub mod types;

mod ffi;

// Re-export core public API at crate root.
pub use client::{Client, ClientBuilder, init_logger, version};
pub use error::{Error, Result};
pub use types::{Bucket, ErrorCode};
