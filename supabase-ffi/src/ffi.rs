//! Core FFI infrastructure: thread-scoped last error, call dispatch, string helpers, logger.

use std::cell::RefCell;
use std::ffi::{CStr, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;

use serde_json::Value;

use crate::buffer::{check_out_buffer, write_payload};
use crate::client::{Client, SupabaseClient};
use crate::error::{Error, Result, SupabaseError};
use crate::state::ErrorState;

// ---------------------------------------------------------------------------
// Thread-scoped last error
// ---------------------------------------------------------------------------

thread_local! {
    static LAST_ERROR: RefCell<ErrorState> = RefCell::new(ErrorState::default());
}

/// Run `f` against the calling thread's error state.
pub(crate) fn with_last_error<R>(f: impl FnOnce(&ErrorState) -> R) -> R {
    LAST_ERROR.with(|e| f(&e.borrow()))
}

fn reset_last_error() {
    LAST_ERROR.with(|e| e.borrow_mut().reset());
}

/// Copy the calling thread's last error message into `buffer` and return its code.
///
/// Returns `SUPABASE_SUCCESS` with an empty message when the last call on this
/// thread succeeded. The message is cut to fit and always NUL-terminated. A null
/// `buffer` or zero `buffer_len` returns the code without writing.
///
/// # Safety
///
/// `buffer` must be null or valid for `buffer_len` bytes of writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_get_last_error(
    buffer: *mut c_char,
    buffer_len: usize,
) -> SupabaseError {
    with_last_error(|e| unsafe { e.copy_out(buffer, buffer_len) })
}

/// Bytes needed to hold the calling thread's last error message, NUL included.
/// Returns 0 if there is no error.
#[unsafe(no_mangle)]
pub extern "C" fn supabase_last_error_length() -> usize {
    with_last_error(|e| {
        if e.message().is_empty() {
            0
        } else {
            e.message().len() + 1
        }
    })
}

/// Number of failures recorded on the calling thread so far.
#[unsafe(no_mangle)]
pub extern "C" fn supabase_last_error_sequence() -> u64 {
    with_last_error(ErrorState::sequence)
}

/// Forget the calling thread's last error.
#[unsafe(no_mangle)]
pub extern "C" fn supabase_clear_last_error() {
    reset_last_error();
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run `f`, turning a panic into [`Error::Panic`].
fn guard<T>(op: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default();
        Err(Error::Panic { op, message })
    })
}

/// Record `err` in the handle scope (if any) and the thread scope, return its code.
fn fail(handle: Option<&SupabaseClient>, op: &'static str, err: &Error) -> SupabaseError {
    let code = err.code();
    tracing::warn!(op, code = code as i32, "{err}");
    if let Some(h) = handle {
        h.errors.lock().record_error(err);
    }
    LAST_ERROR.with(|e| e.borrow_mut().record_error(err));
    code
}

/// Run a call that has no client handle. Only the thread scope is touched.
pub(crate) fn run_unbound(op: &'static str, f: impl FnOnce() -> Result<()>) -> SupabaseError {
    reset_last_error();
    match guard(op, f) {
        Ok(()) => SupabaseError::Success,
        Err(e) => fail(None, op, &e),
    }
}

/// Run a call against a client handle.
///
/// Both error scopes are reset on entry, so a successful call leaves them
/// reporting `Success`; a failed call leaves its own error in both.
///
/// # Safety
///
/// `client` must be null or a live handle from `supabase_client_new*`.
pub(crate) unsafe fn run(
    client: *const SupabaseClient,
    op: &'static str,
    f: impl FnOnce(&Client) -> Result<()>,
) -> SupabaseError {
    reset_last_error();
    let handle = match unsafe { handle_ref(client) } {
        Ok(h) => h,
        Err(e) => return fail(None, op, &e),
    };
    handle.errors.lock().reset();
    match guard(op, || f(&handle.inner)) {
        Ok(()) => SupabaseError::Success,
        Err(e) => fail(Some(handle), op, &e),
    }
}

/// Run a façade operation and write its JSON result into the caller's buffer.
///
/// The buffer is checked before `f` runs, so a missing buffer never triggers a
/// remote call. A result that does not fit fails with `BufferTooSmall` and the
/// buffer is left untouched.
///
/// # Safety
///
/// `client` as for [`run`]; `out` must be null or valid for `out_len` bytes of writes.
pub(crate) unsafe fn dispatch(
    client: *const SupabaseClient,
    op: &'static str,
    out: *mut c_char,
    out_len: usize,
    f: impl FnOnce(&Client) -> Result<Value>,
) -> SupabaseError {
    unsafe {
        run(client, op, |c| {
            check_out_buffer(out, out_len)?;
            let value = f(c)?;
            let payload = serde_json::to_string(&value)
                .map_err(|e| Error::Runtime(format!("serializing result: {e}")))?;
            write_payload(out, out_len, &payload)
        })
    }
}

// ---------------------------------------------------------------------------
// Pointer and string helpers
// ---------------------------------------------------------------------------

/// Validate a handle pointer and borrow it.
pub(crate) unsafe fn handle_ref<'a>(ptr: *const SupabaseClient) -> Result<&'a SupabaseClient> {
    unsafe { ptr.as_ref() }.ok_or_else(|| Error::invalid("null client handle"))
}

/// Borrow a required C string argument: non-null, UTF-8, not blank.
pub(crate) unsafe fn c_str_arg<'a>(s: *const c_char, name: &str) -> Result<&'a str> {
    if s.is_null() {
        return Err(Error::invalid(format!("{name} is null")));
    }
    let s = unsafe { CStr::from_ptr(s) }
        .to_str()
        .map_err(|_| Error::invalid(format!("{name} is not valid UTF-8")))?;
    if s.trim().is_empty() {
        return Err(Error::invalid(format!("{name} is blank")));
    }
    Ok(s)
}

/// Borrow an optional C string argument. Null and blank both mean `None`.
pub(crate) unsafe fn c_str_opt<'a>(s: *const c_char, name: &str) -> Result<Option<&'a str>> {
    if s.is_null() {
        return Ok(None);
    }
    let s = unsafe { CStr::from_ptr(s) }
        .to_str()
        .map_err(|_| Error::invalid(format!("{name} is not valid UTF-8")))?;
    Ok(Some(s).filter(|s| !s.trim().is_empty()))
}

/// Parse a JSON argument.
pub(crate) fn json_arg(s: &str, name: &str) -> Result<Value> {
    serde_json::from_str(s).map_err(|e| Error::invalid(format!("{name} is not valid JSON: {e}")))
}

/// Box a value and return a raw pointer.
pub(crate) fn into_raw<T>(val: T) -> *mut T {
    Box::into_raw(Box::new(val))
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Library version as a static NUL-terminated string. Never free it.
#[unsafe(no_mangle)]
pub extern "C" fn supabase_version() -> *const c_char {
    VERSION.as_ptr().cast()
}

// ---------------------------------------------------------------------------
// Logger initialization
// ---------------------------------------------------------------------------

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Install a `tracing` subscriber that writes to stderr. `level` is a filter
/// directive such as "debug", "warn" or "supabase_ffi=trace"; null means "info".
/// Only the first call has an effect.
///
/// # Safety
///
/// `level` must be null or a valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn supabase_init_logger(level: *const c_char) -> SupabaseError {
    run_unbound("supabase_init_logger", || {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        let directive = unsafe { c_str_opt(level, "level")? }.unwrap_or("info");
        LOGGER_INIT.get_or_init(|| {
            let filter = EnvFilter::builder().parse_lossy(directive);
            // A host that already installed a global subscriber keeps it.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .try_init();
        });
        Ok(())
    })
}
