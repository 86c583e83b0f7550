//! Edge function invocation (`/functions/v1`).

use std::ffi::c_char;

use serde_json::Value;
use tracing::info;

use crate::client::{Client, Credential, SupabaseClient};
use crate::error::{Result, Service, SupabaseError};
use crate::ffi::*;
use crate::transport::Method;

impl Client {
    /// Invoke edge function `name` with an optional JSON body.
    ///
    /// Functions may answer with plain text; a 2xx body that is not JSON is
    /// returned as a JSON string.
    pub fn invoke(&self, name: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.config().endpoint(&["functions", "v1", name.trim()])?;
        let response = self.exchange(
            Service::Functions,
            Method::Post,
            url,
            body.map(Value::to_string),
            &[],
            Credential::User,
        )?;
        let value = if response.body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response.body).unwrap_or(Value::String(response.body))
        };
        info!(function = name, "invoked function");
        Ok(value)
    }
}

/// Invoke edge function `name`. `json` is the request body and may be null.
/// On success `result` receives the function's response.
///
/// # Safety
///
/// `client` must be null or a live handle; string arguments must be null or
/// valid C strings; `result` must be null or valid for `result_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_functions_invoke(
    client: *mut SupabaseClient,
    name: *const c_char,
    json: *const c_char,
    result: *mut c_char,
    result_len: usize,
) -> SupabaseError {
    let op = |c: &Client| -> Result<Value> {
        let name = unsafe { c_str_arg(name, "function name")? };
        let body = unsafe { c_str_opt(json, "json")? }
            .map(|s| json_arg(s, "json"))
            .transpose()?;
        c.invoke(name, body.as_ref())
    };
    unsafe { dispatch(client, "supabase_functions_invoke", result, result_len, op) }
}
