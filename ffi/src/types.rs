//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointer + length instead of
//! `Vec<u8>`, and tagged enums with explicit discriminants. Conversion
//! functions live here to keep `lib.rs` focused on the `extern "C"`
//! surface.

use std::ffi::CString;
use std::os::raw::{c_char, c_void};

use transfer_core::error::TransferError;
use transfer_core::response::Response;
use transfer_core::transport::Method;

use crate::host::HostTransport;

/// Opaque handle to a `TransferHandle`. C callers receive a pointer to
/// this and pass it back into every FFI function.
pub struct FfiTransferHandle {
    pub(crate) inner: transfer_core::TransferHandle<HostTransport>,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiMethod {
    Get = 0,
    Post = 1,
}

impl From<FfiMethod> for Method {
    fn from(m: FfiMethod) -> Self {
        match m {
            FfiMethod::Get => Method::Get,
            FfiMethod::Post => Method::Post,
        }
    }
}

impl From<Method> for FfiMethod {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => FfiMethod::Get,
            Method::Post => FfiMethod::Post,
        }
    }
}

/// Read-only view of the handle's configuration, handed to the executor.
///
/// String fields are null when unset. All pointers are owned by the FFI
/// layer and valid only for the duration of the executor call.
#[repr(C)]
pub struct FfiRequestView {
    pub url: *const c_char,
    pub method: FfiMethod,
    pub user_agent: *const c_char,
    pub referer: *const c_char,
    pub cookie: *const c_char,
    pub verify_certificates: bool,
    pub verbose: bool,
    pub fail_on_error: bool,
    /// Encoded request body; `post_fields_len` is its byte length.
    pub post_fields: *const u8,
    pub post_fields_len: usize,
}

// ---------------------------------------------------------------------------
// Executor contract
// ---------------------------------------------------------------------------

/// Opaque chunk sink handed to the executor. Valid only during the
/// executor call; response bytes are pushed through
/// `transfer_sink_write_header` and `transfer_sink_write_body`.
pub struct FfiChunkSink {
    pub(crate) sink: *mut c_void,
}

/// Outcome discriminant returned by a host executor.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FfiOutcomeKind {
    Success = 0,
    Failed = 1,
    Cancelled = 2,
}

/// Terminal outcome of one executor invocation.
///
/// `status` is read for `Success`, `code` and `message` for `Failed`.
/// `message` may be null; when set it is copied before the call returns,
/// so the executor may hand out a stack or static string.
#[repr(C)]
pub struct FfiOutcome {
    pub kind: FfiOutcomeKind,
    pub status: u16,
    pub code: i32,
    pub message: *const c_char,
}

/// Host executor: performs the exchange described by `request`, pushing
/// response bytes into `sink`, then returns the terminal outcome. The C
/// caller is the transport.
pub type FfiExecuteFn = extern "C" fn(
    user_data: *mut c_void,
    request: *const FfiRequestView,
    sink: *mut FfiChunkSink,
) -> FfiOutcome;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error discriminant carried by `FfiTransferResult` and returned by
/// configuration functions.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FfiErrorCode {
    Ok = 0,
    NullArg = 1,
    Disposed = 2,
    Engine = 3,
    HttpError = 4,
    Cancelled = 5,
    OutOfMemory = 6,
    InfoUnavailable = 7,
    InvalidConfiguration = 8,
    Panic = 9,
}

impl From<&TransferError> for FfiErrorCode {
    fn from(e: &TransferError) -> Self {
        match e {
            TransferError::UseAfterDispose => FfiErrorCode::Disposed,
            TransferError::Engine { .. } => FfiErrorCode::Engine,
            TransferError::HttpError { .. } => FfiErrorCode::HttpError,
            TransferError::Cancelled => FfiErrorCode::Cancelled,
            TransferError::OutOfMemory => FfiErrorCode::OutOfMemory,
            TransferError::InfoUnavailable(_) => FfiErrorCode::InfoUnavailable,
            TransferError::InvalidConfiguration(_) => FfiErrorCode::InvalidConfiguration,
        }
    }
}

/// Result envelope returned by perform-style FFI functions.
///
/// `error_code == Ok` means `status`, `header`, and `body` are set;
/// otherwise `error_message` describes the failure. The caller owns the
/// pointer and must release it with `transfer_free_result`.
#[repr(C)]
pub struct FfiTransferResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub status: u16,
    pub header: *mut c_char,
    pub body: *mut c_char,
}

impl FfiTransferResult {
    pub(crate) fn ok(response: Response) -> *mut Self {
        Box::into_raw(Box::new(Self {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            status: response.status,
            header: CString::new(response.header).unwrap().into_raw(),
            body: CString::new(response.body).unwrap().into_raw(),
        }))
    }

    pub(crate) fn from_error(error: TransferError) -> *mut Self {
        Box::into_raw(Box::new(Self {
            error_code: FfiErrorCode::from(&error),
            error_message: CString::new(error.to_string()).unwrap().into_raw(),
            status: 0,
            header: std::ptr::null_mut(),
            body: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Box::into_raw(Box::new(Self {
            error_code: FfiErrorCode::NullArg,
            error_message: CString::new(format!("required argument is null: {name}"))
                .unwrap()
                .into_raw(),
            status: 0,
            header: std::ptr::null_mut(),
            body: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn panic(context: &str) -> *mut Self {
        Box::into_raw(Box::new(Self {
            error_code: FfiErrorCode::Panic,
            error_message: CString::new(context).unwrap().into_raw(),
            status: 0,
            header: std::ptr::null_mut(),
            body: std::ptr::null_mut(),
        }))
    }
}
