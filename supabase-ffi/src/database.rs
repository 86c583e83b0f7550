//! Table reads and writes through PostgREST (`/rest/v1`).

use std::ffi::c_char;

use serde_json::Value;
use tracing::info;

use crate::client::{Client, Credential, SupabaseClient};
use crate::error::{Error, Result, Service, SupabaseError};
use crate::ffi::*;
use crate::transport::Method;

/// Strip whitespace around each comma-separated column.
fn normalize_columns(columns: &str) -> String {
    columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

impl Client {
    /// Read rows from `table`. `columns` is a PostgREST select list such as
    /// `"*"` or `"id,name,author(name)"`.
    pub fn select(&self, table: &str, columns: &str) -> Result<Value> {
        let columns = normalize_columns(columns);
        let columns = if columns.is_empty() { "*" } else { columns.as_str() };
        let mut url = self.config().endpoint(&["rest", "v1", table.trim()])?;
        url.query_pairs_mut().append_pair("select", columns);
        let schema = self.config().schema_name();
        let rows = self.call(
            Service::Database,
            Method::Get,
            url,
            None,
            &[("Accept-Profile", schema)],
            Credential::User,
        )?;
        info!(table, rows = rows.as_array().map_or(0, Vec::len), "selected rows");
        Ok(rows)
    }

    /// Insert one row (an object) or many (an array of objects) and return the
    /// inserted representation.
    pub fn insert(&self, table: &str, rows: &Value) -> Result<Value> {
        let valid = match rows {
            Value::Object(_) => true,
            Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_object),
            _ => false,
        };
        if !valid {
            return Err(Error::invalid(
                "insert payload must be an object or a non-empty array of objects",
            ));
        }
        let url = self.config().endpoint(&["rest", "v1", table.trim()])?;
        let schema = self.config().schema_name();
        let inserted = self.call(
            Service::Database,
            Method::Post,
            url,
            Some(rows.to_string()),
            &[("Prefer", "return=representation"), ("Content-Profile", schema)],
            Credential::User,
        )?;
        info!(table, "inserted rows");
        Ok(inserted)
    }
}

/// Select `columns` from `table`. Null or blank `columns` selects `*`.
/// On success `result` receives the rows as a JSON array.
///
/// # Safety
///
/// `client` must be null or a live handle; string arguments must be null or
/// valid C strings; `result` must be null or valid for `result_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_database_select(
    client: *mut SupabaseClient,
    table: *const c_char,
    columns: *const c_char,
    result: *mut c_char,
    result_len: usize,
) -> SupabaseError {
    let op = |c: &Client| -> Result<Value> {
        let table = unsafe { c_str_arg(table, "table")? };
        let columns = unsafe { c_str_opt(columns, "columns")? }.unwrap_or("*");
        c.select(table, columns)
    };
    unsafe { dispatch(client, "supabase_database_select", result, result_len, op) }
}

/// Insert `json` (an object or an array of objects) into `table`. On success
/// `result` receives the inserted rows.
///
/// # Safety
///
/// Same as [`supabase_database_select`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_database_insert(
    client: *mut SupabaseClient,
    table: *const c_char,
    json: *const c_char,
    result: *mut c_char,
    result_len: usize,
) -> SupabaseError {
    let op = |c: &Client| -> Result<Value> {
        let table = unsafe { c_str_arg(table, "table")? };
        let rows = json_arg(unsafe { c_str_arg(json, "json")? }, "json")?;
        c.insert(table, &rows)
    };
    unsafe { dispatch(client, "supabase_database_insert", result, result_len, op) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_normalized() {
        assert_eq!(normalize_columns("*"), "*");
        assert_eq!(normalize_columns(" id , name ,"), "id,name");
        assert_eq!(normalize_columns("id,author(name)"), "id,author(name)");
        assert_eq!(normalize_columns(" , "), "");
    }
}
