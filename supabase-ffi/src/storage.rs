//! Storage buckets (`/storage/v1`).

use std::ffi::c_char;

use serde_json::Value;
use tracing::info;

use crate::client::{Client, Credential, SupabaseClient};
use crate::error::{Result, Service, SupabaseError};
use crate::ffi::*;
use crate::transport::Method;

impl Client {
    /// List all buckets. Uses the service-role key when one is configured.
    pub fn list_buckets(&self) -> Result<Value> {
        let url = self.config().endpoint(&["storage", "v1", "bucket"])?;
        let buckets = self.call(
            Service::Storage,
            Method::Get,
            url,
            None,
            &[],
            Credential::Admin,
        )?;
        info!(count = buckets.as_array().map_or(0, Vec::len), "listed buckets");
        Ok(buckets)
    }
}

/// List storage buckets. On success `result` receives a JSON array of buckets.
///
/// # Safety
///
/// `client` must be null or a live handle; `result` must be null or valid for
/// `result_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_storage_list_buckets(
    client: *mut SupabaseClient,
    result: *mut c_char,
    result_len: usize,
) -> SupabaseError {
    unsafe {
        dispatch(
            client,
            "supabase_storage_list_buckets",
            result,
            result_len,
            Client::list_buckets,
        )
    }
}
