//! C-ABI wrapper around `transfer-core`.
//!
//! # Overview
//! Exposes the transfer-handle API through `extern "C"` functions so any
//! language with a C FFI can configure handles, run transfers, and read
//! responses. The embedding application supplies the transport side: it
//! registers an executor callback at handle creation and streams response
//! bytes back through the exported sink functions.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Configuration functions return an `FfiErrorCode`; perform-style
//!   functions return an `FfiTransferResult` envelope conveying success
//!   payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `transfer_free_*` function to release them.
//! - `transfer_handle_dispose` releases the transport early and is
//!   idempotent; `transfer_handle_free` disposes and deallocates.

pub mod host;
pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::panic::catch_unwind;

use host::HostTransport;
use transfer_core::error::TransferError;
use transfer_core::ChunkSink;
use types::*;

fn code_of<T>(result: Result<T, TransferError>) -> FfiErrorCode {
    match result {
        Ok(_) => FfiErrorCode::Ok,
        Err(e) => FfiErrorCode::from(&e),
    }
}

// ---------------------------------------------------------------------------
// Handle lifecycle
// ---------------------------------------------------------------------------

/// Create a transfer handle whose exchanges are run by `executor`.
///
/// `executor` may be null; `perform` then fails with an engine error until
/// the handle is recreated with one. `user_data` is passed through to every
/// executor invocation. The caller must free the returned pointer with
/// `transfer_handle_free`.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_new(
    executor: Option<FfiExecuteFn>,
    user_data: *mut c_void,
) -> *mut FfiTransferHandle {
    catch_unwind(|| {
        let transport = HostTransport::new(executor, user_data);
        Box::into_raw(Box::new(FfiTransferHandle {
            inner: transfer_core::TransferHandle::new(transport),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Dispose the handle's transport without deallocating the handle. Any
/// later configuration or perform call fails with `Disposed`. Calling this
/// again, or freeing the handle afterwards, is safe.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_dispose(handle: *mut FfiTransferHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(|| {
            let handle = unsafe { &mut *handle };
            handle.inner.dispose();
        });
    }
}

/// Free a handle created by `transfer_handle_new`, disposing it first.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_free(handle: *mut FfiTransferHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(handle) });
        });
    }
}

// ---------------------------------------------------------------------------
// Configuration functions
// ---------------------------------------------------------------------------

/// Set the target URL. Fails with `InvalidConfiguration` for a malformed
/// or relative URL so the error is attributable to this call.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_url(
    handle: *mut FfiTransferHandle,
    url: *const c_char,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() || url.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        let url = match unsafe { CStr::from_ptr(url) }.to_str() {
            Ok(s) => s,
            Err(_) => return FfiErrorCode::InvalidConfiguration,
        };
        code_of(handle.inner.set_url(url))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_user_agent(
    handle: *mut FfiTransferHandle,
    agent: *const c_char,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() || agent.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        let agent = unsafe { CStr::from_ptr(agent) }.to_str().unwrap_or("");
        code_of(handle.inner.set_user_agent(agent))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_referer(
    handle: *mut FfiTransferHandle,
    referer: *const c_char,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() || referer.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        let referer = unsafe { CStr::from_ptr(referer) }.to_str().unwrap_or("");
        code_of(handle.inner.set_referer(referer))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

/// Set the cookie sent with the next transfer, formatted `name=value;`.
/// Calling this again replaces the previous cookie.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_cookie(
    handle: *mut FfiTransferHandle,
    name: *const c_char,
    value: *const c_char,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() || name.is_null() || value.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        let name = unsafe { CStr::from_ptr(name) }.to_str().unwrap_or("");
        let value = unsafe { CStr::from_ptr(value) }.to_str().unwrap_or("");
        code_of(handle.inner.set_cookie(name, value))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_verify_certificates(
    handle: *mut FfiTransferHandle,
    enabled: bool,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        code_of(handle.inner.set_verify_certificates(enabled))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_verbose(
    handle: *mut FfiTransferHandle,
    enabled: bool,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        code_of(handle.inner.set_verbose(enabled))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_fail_on_error(
    handle: *mut FfiTransferHandle,
    enabled: bool,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        code_of(handle.inner.set_fail_on_error(enabled))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_include_headers(
    handle: *mut FfiTransferHandle,
    enabled: bool,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        code_of(handle.inner.set_include_headers_in_body(enabled))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_method(
    handle: *mut FfiTransferHandle,
    method: FfiMethod,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        code_of(handle.inner.set_method(method.into()))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

/// Set the encoded form body from raw bytes. `len` is the byte length;
/// the content length seen by the executor is exactly `len`, so multi-byte
/// text never truncates. `data` may be null only when `len` is zero.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_set_post_fields(
    handle: *mut FfiTransferHandle,
    data: *const u8,
    len: usize,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() || (data.is_null() && len != 0) {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &mut *handle };
        let fields = if len == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(data, len) }
        };
        code_of(handle.inner.set_post_fields_bytes(fields))
    })
    .unwrap_or(FfiErrorCode::Panic)
}

// ---------------------------------------------------------------------------
// Transfer functions
// ---------------------------------------------------------------------------

/// Run the configured transfer. The caller must free the returned envelope
/// with `transfer_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_perform(
    handle: *mut FfiTransferHandle,
) -> *mut FfiTransferResult {
    catch_unwind(|| {
        if handle.is_null() {
            return FfiTransferResult::null_arg("handle");
        }
        let handle = unsafe { &mut *handle };
        match handle.inner.perform() {
            Ok(response) => FfiTransferResult::ok(response),
            Err(e) => FfiTransferResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiTransferResult::panic("panic in transfer_handle_perform"))
}

/// Run an HTTP GET. `url` may be null to reuse the configured URL.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_get(
    handle: *mut FfiTransferHandle,
    url: *const c_char,
) -> *mut FfiTransferResult {
    catch_unwind(|| {
        if handle.is_null() {
            return FfiTransferResult::null_arg("handle");
        }
        let handle = unsafe { &mut *handle };
        let url = if url.is_null() {
            None
        } else {
            match unsafe { CStr::from_ptr(url) }.to_str() {
                Ok(s) => Some(s),
                Err(_) => {
                    return FfiTransferResult::from_error(TransferError::InvalidConfiguration(
                        "url is not valid UTF-8".to_string(),
                    ))
                }
            }
        };
        match handle.inner.get(url) {
            Ok(response) => FfiTransferResult::ok(response),
            Err(e) => FfiTransferResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiTransferResult::panic("panic in transfer_handle_get"))
}

/// Run an HTTP POST. `url` may be null to reuse the configured URL;
/// `fields` may be null to reuse the configured post fields.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_post(
    handle: *mut FfiTransferHandle,
    url: *const c_char,
    fields: *const u8,
    fields_len: usize,
) -> *mut FfiTransferResult {
    catch_unwind(|| {
        if handle.is_null() {
            return FfiTransferResult::null_arg("handle");
        }
        let handle = unsafe { &mut *handle };
        let url = if url.is_null() {
            None
        } else {
            match unsafe { CStr::from_ptr(url) }.to_str() {
                Ok(s) => Some(s),
                Err(_) => {
                    return FfiTransferResult::from_error(TransferError::InvalidConfiguration(
                        "url is not valid UTF-8".to_string(),
                    ))
                }
            }
        };
        if fields.is_null() && fields_len != 0 {
            return FfiTransferResult::null_arg("fields");
        }
        if !fields.is_null() {
            let data = unsafe { std::slice::from_raw_parts(fields, fields_len) };
            if let Err(e) = handle.inner.set_post_fields_bytes(data) {
                return FfiTransferResult::from_error(e);
            }
        }
        match handle.inner.post(url, None) {
            Ok(response) => FfiTransferResult::ok(response),
            Err(e) => FfiTransferResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiTransferResult::panic("panic in transfer_handle_post"))
}

/// Status code of the most recently completed transfer, written to
/// `out_status`. Fails with `InfoUnavailable` before the first completed
/// transfer.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_handle_status_code(
    handle: *const FfiTransferHandle,
    out_status: *mut u16,
) -> FfiErrorCode {
    catch_unwind(|| {
        if handle.is_null() || out_status.is_null() {
            return FfiErrorCode::NullArg;
        }
        let handle = unsafe { &*handle };
        match handle.inner.info().status_code() {
            Ok(status) => {
                unsafe { *out_status = status };
                FfiErrorCode::Ok
            }
            Err(e) => FfiErrorCode::from(&e),
        }
    })
    .unwrap_or(FfiErrorCode::Panic)
}

/// Percent-encode `text`. Returns null on error; the caller frees the
/// result with `transfer_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_url_encode(
    handle: *const FfiTransferHandle,
    text: *const c_char,
) -> *mut c_char {
    catch_unwind(|| {
        if handle.is_null() || text.is_null() {
            return std::ptr::null_mut();
        }
        let handle = unsafe { &*handle };
        let text = match unsafe { CStr::from_ptr(text) }.to_str() {
            Ok(s) => s,
            Err(_) => return std::ptr::null_mut(),
        };
        match handle.inner.url_encode(text) {
            Ok(encoded) => CString::new(encoded).unwrap().into_raw(),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Sink functions (called by the executor during a transfer)
// ---------------------------------------------------------------------------

fn sink_write(sink: *mut FfiChunkSink, data: *const u8, len: usize, header: bool) -> bool {
    catch_unwind(|| {
        if sink.is_null() || (data.is_null() && len != 0) {
            return false;
        }
        let chunk = if len == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(data, len) }
        };
        let sink = unsafe { &mut *sink };
        let inner = unsafe { &mut *(sink.sink as *mut &mut dyn ChunkSink) };
        if header {
            inner.on_header(chunk)
        } else {
            inner.on_body(chunk)
        }
    })
    .unwrap_or(false)
}

/// Push a header chunk into the in-flight transfer. Returns false when
/// delivery must stop (the executor should then return a failed outcome).
#[unsafe(no_mangle)]
pub extern "C" fn transfer_sink_write_header(
    sink: *mut FfiChunkSink,
    data: *const u8,
    len: usize,
) -> bool {
    sink_write(sink, data, len, true)
}

/// Push a body chunk into the in-flight transfer. Returns false when
/// delivery must stop.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_sink_write_body(
    sink: *mut FfiChunkSink,
    data: *const u8,
    len: usize,
) -> bool {
    sink_write(sink, data, len, false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiTransferResult` returned by a perform-style function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_free_result(result: *mut FfiTransferResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.header.is_null() {
            drop(unsafe { CString::from_raw(result.header) });
        }
        if !result.body.is_null() {
            drop(unsafe { CString::from_raw(result.body) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn transfer_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    extern "C" fn hello_executor(
        _user_data: *mut c_void,
        _request: *const FfiRequestView,
        sink: *mut FfiChunkSink,
    ) -> FfiOutcome {
        let header = b"Content-Type: text/plain\r\n";
        assert!(transfer_sink_write_header(sink, header.as_ptr(), header.len()));
        for chunk in [&b"Hello, "[..], b"World!"] {
            assert!(transfer_sink_write_body(sink, chunk.as_ptr(), chunk.len()));
        }
        FfiOutcome {
            kind: FfiOutcomeKind::Success,
            status: 200,
            code: 0,
            message: std::ptr::null(),
        }
    }

    extern "C" fn echo_executor(
        _user_data: *mut c_void,
        request: *const FfiRequestView,
        sink: *mut FfiChunkSink,
    ) -> FfiOutcome {
        let request = unsafe { &*request };
        if !request.post_fields.is_null() && request.post_fields_len != 0 {
            assert!(transfer_sink_write_body(
                sink,
                request.post_fields,
                request.post_fields_len
            ));
        }
        FfiOutcome {
            kind: FfiOutcomeKind::Success,
            status: 200,
            code: 0,
            message: std::ptr::null(),
        }
    }

    extern "C" fn failing_executor(
        _user_data: *mut c_void,
        _request: *const FfiRequestView,
        _sink: *mut FfiChunkSink,
    ) -> FfiOutcome {
        static MESSAGE: &[u8] = b"could not resolve host\0";
        FfiOutcome {
            kind: FfiOutcomeKind::Failed,
            status: 0,
            code: 6,
            message: MESSAGE.as_ptr() as *const c_char,
        }
    }

    fn new_handle(executor: FfiExecuteFn) -> *mut FfiTransferHandle {
        let handle = transfer_handle_new(Some(executor), std::ptr::null_mut());
        assert!(!handle.is_null());
        handle
    }

    #[test]
    fn handle_new_and_free() {
        let handle = new_handle(hello_executor);
        transfer_handle_free(handle);
    }

    #[test]
    fn free_null_is_safe() {
        transfer_handle_free(std::ptr::null_mut());
        transfer_free_result(std::ptr::null_mut());
        transfer_free_string(std::ptr::null_mut());
        transfer_handle_dispose(std::ptr::null_mut());
    }

    #[test]
    fn set_url_null_args() {
        let handle = new_handle(hello_executor);
        let url = CString::new("http://example.test/").unwrap();
        assert_eq!(
            transfer_handle_set_url(std::ptr::null_mut(), url.as_ptr()),
            FfiErrorCode::NullArg
        );
        assert_eq!(
            transfer_handle_set_url(handle, std::ptr::null()),
            FfiErrorCode::NullArg
        );
        transfer_handle_free(handle);
    }

    #[test]
    fn set_url_rejects_malformed_url() {
        let handle = new_handle(hello_executor);
        let url = CString::new("not an url").unwrap();
        assert_eq!(
            transfer_handle_set_url(handle, url.as_ptr()),
            FfiErrorCode::InvalidConfiguration
        );
        transfer_handle_free(handle);
    }

    #[test]
    fn perform_roundtrip() {
        let handle = new_handle(hello_executor);
        let url = CString::new("http://example.test/ok").unwrap();
        assert_eq!(transfer_handle_set_url(handle, url.as_ptr()), FfiErrorCode::Ok);

        let result = transfer_handle_perform(handle);
        assert!(!result.is_null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.status, 200);
        let header = unsafe { CStr::from_ptr(r.header) }.to_str().unwrap();
        assert_eq!(header, "Content-Type: text/plain\r\n");
        let body = unsafe { CStr::from_ptr(r.body) }.to_str().unwrap();
        assert_eq!(body, "Hello, World!");

        let mut status = 0u16;
        assert_eq!(
            transfer_handle_status_code(handle, &mut status),
            FfiErrorCode::Ok
        );
        assert_eq!(status, 200);

        transfer_free_result(result);
        transfer_handle_free(handle);
    }

    #[test]
    fn get_convenience_performs() {
        let handle = new_handle(hello_executor);
        let url = CString::new("http://example.test/ok").unwrap();
        let result = transfer_handle_get(handle, url.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        let body = unsafe { CStr::from_ptr(r.body) }.to_str().unwrap();
        assert_eq!(body, "Hello, World!");

        transfer_free_result(result);
        transfer_handle_free(handle);
    }

    #[test]
    fn post_preserves_multibyte_field_bytes() {
        let handle = new_handle(echo_executor);
        let url = CString::new("http://example.test/echo").unwrap();
        let fields = "name=caf\u{e9}&mood=\u{2615}";

        let result = transfer_handle_post(
            handle,
            url.as_ptr(),
            fields.as_ptr(),
            fields.as_bytes().len(),
        );
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        let body = unsafe { CStr::from_ptr(r.body) }.to_str().unwrap();
        assert_eq!(body, fields);
        assert_eq!(body.as_bytes().len(), fields.as_bytes().len());

        transfer_free_result(result);
        transfer_handle_free(handle);
    }

    #[test]
    fn absent_post_fields_send_empty_body() {
        let handle = new_handle(echo_executor);
        let url = CString::new("http://example.test/echo").unwrap();
        let result = transfer_handle_post(handle, url.as_ptr(), std::ptr::null(), 0);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        let body = unsafe { CStr::from_ptr(r.body) }.to_str().unwrap();
        assert!(body.is_empty());

        transfer_free_result(result);
        transfer_handle_free(handle);
    }

    #[test]
    fn failing_executor_surfaces_engine_error() {
        let handle = new_handle(failing_executor);
        let url = CString::new("http://no-such-host.test/").unwrap();
        let result = transfer_handle_get(handle, url.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Engine);
        let message = unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap();
        assert!(message.contains("could not resolve host"));

        transfer_free_result(result);
        transfer_handle_free(handle);
    }

    #[test]
    fn null_executor_fails_perform() {
        let handle = transfer_handle_new(None, std::ptr::null_mut());
        let url = CString::new("http://example.test/").unwrap();
        let result = transfer_handle_get(handle, url.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Engine);

        transfer_free_result(result);
        transfer_handle_free(handle);
    }

    #[test]
    fn disposed_handle_rejects_operations() {
        let handle = new_handle(hello_executor);
        transfer_handle_dispose(handle);
        transfer_handle_dispose(handle);

        let url = CString::new("http://example.test/").unwrap();
        assert_eq!(
            transfer_handle_set_url(handle, url.as_ptr()),
            FfiErrorCode::Disposed
        );

        let result = transfer_handle_perform(handle);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Disposed);

        transfer_free_result(result);
        transfer_handle_free(handle);
    }

    #[test]
    fn status_code_before_transfer_is_unavailable() {
        let handle = new_handle(hello_executor);
        let mut status = 0u16;
        assert_eq!(
            transfer_handle_status_code(handle, &mut status),
            FfiErrorCode::InfoUnavailable
        );
        transfer_handle_free(handle);
    }

    #[test]
    fn url_encode_roundtrip() {
        let handle = new_handle(hello_executor);
        let text = CString::new("a b&c").unwrap();
        let encoded = transfer_url_encode(handle, text.as_ptr());
        assert!(!encoded.is_null());
        assert_eq!(
            unsafe { CStr::from_ptr(encoded) }.to_str().unwrap(),
            "a%20b%26c"
        );
        transfer_free_string(encoded);

        assert!(transfer_url_encode(std::ptr::null(), text.as_ptr()).is_null());
        transfer_handle_free(handle);
    }
}
