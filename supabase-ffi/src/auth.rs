//! Email/password authentication against GoTrue (`/auth/v1`).

use std::ffi::c_char;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::client::{Client, Credential, SupabaseClient};
use crate::error::{Error, Result, Service, SupabaseError};
use crate::ffi::*;
use crate::transport::Method;

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

fn credentials_body(email: &str, password: &str) -> Result<String> {
    serde_json::to_string(&PasswordCredentials { email, password })
        .map_err(|e| Error::Runtime(format!("encoding credentials: {e}")))
}

impl Client {
    /// Exchange email and password for a session. The session is kept on the
    /// client and used as bearer token for later calls.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Value> {
        let mut url = self.config().endpoint(&["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let response = self.call(
            Service::Auth,
            Method::Post,
            url,
            Some(credentials_body(email, password)?),
            &[],
            Credential::Anon,
        )?;
        self.store_session(&response);
        info!("signed in");
        Ok(response)
    }

    /// Register a new user. When the project auto-confirms, the returned
    /// session is kept just like [`sign_in`](Self::sign_in).
    pub fn sign_up(&self, email: &str, password: &str) -> Result<Value> {
        let url = self.config().endpoint(&["auth", "v1", "signup"])?;
        let response = self.call(
            Service::Auth,
            Method::Post,
            url,
            Some(credentials_body(email, password)?),
            &[],
            Credential::Anon,
        )?;
        self.store_session(&response);
        info!("signed up");
        Ok(response)
    }

    /// Revoke the held session. The local session is dropped even when the
    /// server rejects the request. Without a session this is a no-op.
    pub fn sign_out(&self) -> Result<()> {
        let Some(token) = self.take_session() else {
            return Ok(());
        };
        let url = self.config().endpoint(&["auth", "v1", "logout"])?;
        self.exchange(
            Service::Auth,
            Method::Post,
            url,
            None,
            &[],
            Credential::Bearer(token.as_str()),
        )?;
        info!("signed out");
        Ok(())
    }
}

/// Sign in with email and password. On success `result` receives the auth
/// response JSON (session and user).
///
/// # Safety
///
/// `client` must be null or a live handle; string arguments must be null or
/// valid C strings; `result` must be null or valid for `result_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_auth_sign_in(
    client: *mut SupabaseClient,
    email: *const c_char,
    password: *const c_char,
    result: *mut c_char,
    result_len: usize,
) -> SupabaseError {
    let op = |c: &Client| -> Result<Value> {
        let email = unsafe { c_str_arg(email, "email")? };
        let password = unsafe { c_str_arg(password, "password")? };
        c.sign_in(email, password)
    };
    unsafe { dispatch(client, "supabase_auth_sign_in", result, result_len, op) }
}

/// Sign up with email and password. On success `result` receives the created
/// user, or a session when the project auto-confirms.
///
/// # Safety
///
/// Same as [`supabase_auth_sign_in`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_auth_sign_up(
    client: *mut SupabaseClient,
    email: *const c_char,
    password: *const c_char,
    result: *mut c_char,
    result_len: usize,
) -> SupabaseError {
    let op = |c: &Client| -> Result<Value> {
        let email = unsafe { c_str_arg(email, "email")? };
        let password = unsafe { c_str_arg(password, "password")? };
        c.sign_up(email, password)
    };
    unsafe { dispatch(client, "supabase_auth_sign_up", result, result_len, op) }
}

/// Sign out the handle's session, if any.
///
/// # Safety
///
/// `client` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_auth_sign_out(client: *mut SupabaseClient) -> SupabaseError {
    unsafe { run(client, "supabase_auth_sign_out", Client::sign_out) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_json_escaped() {
        let body = credentials_body("a\"b@example.com", "p\\w").unwrap();
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["email"], "a\"b@example.com");
        assert_eq!(v["password"], "p\\w");
    }
}
