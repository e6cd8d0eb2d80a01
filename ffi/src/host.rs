//! Host-executor transport: the C caller performs the exchange.
//!
//! # Design
//! The engine write-callback pattern is preserved across the C boundary
//! but inverted in ownership: instead of the core registering a callback
//! with a native engine, the embedding application registers an executor
//! with the core. During `perform` the executor receives a read-only view
//! of the configuration plus an opaque sink and streams response bytes
//! back through the exported sink functions, in arrival order, exactly as
//! a native engine would into a write callback.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};

use transfer_core::error::TransferError;
use transfer_core::info::{InfoField, InfoValue};
use transfer_core::transport::{ChunkSink, Method, TransferOption, TransferOutcome, Transport};

use crate::types::{FfiChunkSink, FfiExecuteFn, FfiMethod, FfiOutcomeKind, FfiRequestView};

/// Error code reported when `perform` runs without a registered executor.
pub const NO_EXECUTOR_CODE: i32 = -100;

/// `Transport` implementation backed by a C executor callback.
///
/// Configuration is stored as C strings so the request view handed to the
/// executor borrows directly from the transport; nothing is converted
/// during `execute` beyond assembling pointers.
pub struct HostTransport {
    executor: Option<FfiExecuteFn>,
    user_data: *mut c_void,
    url: Option<CString>,
    method: Method,
    user_agent: Option<CString>,
    referer: Option<CString>,
    cookie: Option<CString>,
    verify_certificates: bool,
    verbose: bool,
    fail_on_error: bool,
    post_fields: Option<Vec<u8>>,
    last_status: Option<u16>,
}

impl HostTransport {
    pub(crate) fn new(executor: Option<FfiExecuteFn>, user_data: *mut c_void) -> Self {
        Self {
            executor,
            user_data,
            url: None,
            method: Method::Get,
            user_agent: None,
            referer: None,
            cookie: None,
            verify_certificates: true,
            verbose: false,
            fail_on_error: false,
            post_fields: None,
            last_status: None,
        }
    }
}

fn c_string(value: &str) -> Result<CString, TransferError> {
    CString::new(value)
        .map_err(|_| TransferError::InvalidConfiguration(format!("embedded NUL in {value:?}")))
}

fn copy_message(message: *const c_char) -> String {
    if message.is_null() {
        return "executor reported failure".to_string();
    }
    unsafe { CStr::from_ptr(message) }
        .to_string_lossy()
        .into_owned()
}

impl Transport for HostTransport {
    fn configure(&mut self, option: &TransferOption) -> Result<(), TransferError> {
        match option {
            TransferOption::Url(v) => self.url = Some(c_string(v)?),
            TransferOption::Method(m) => self.method = *m,
            TransferOption::UserAgent(v) => self.user_agent = Some(c_string(v)?),
            TransferOption::Referer(v) => self.referer = Some(c_string(v)?),
            TransferOption::Cookie(v) => self.cookie = Some(c_string(v)?),
            TransferOption::VerifyCertificates(b) => self.verify_certificates = *b,
            TransferOption::Verbose(b) => self.verbose = *b,
            TransferOption::FailOnError(b) => self.fail_on_error = *b,
            TransferOption::PostFields(data) => self.post_fields = Some(data.clone()),
        }
        Ok(())
    }

    fn execute(&mut self, sink: &mut dyn ChunkSink) -> TransferOutcome {
        let Some(executor) = self.executor else {
            return TransferOutcome::Failed {
                code: NO_EXECUTOR_CODE,
                message: "no executor registered".to_string(),
            };
        };

        let text_ptr =
            |v: &Option<CString>| v.as_ref().map_or(std::ptr::null(), |s| s.as_ptr());
        let view = FfiRequestView {
            url: text_ptr(&self.url),
            method: FfiMethod::from(self.method),
            user_agent: text_ptr(&self.user_agent),
            referer: text_ptr(&self.referer),
            cookie: text_ptr(&self.cookie),
            verify_certificates: self.verify_certificates,
            verbose: self.verbose,
            fail_on_error: self.fail_on_error,
            post_fields: self
                .post_fields
                .as_ref()
                .map_or(std::ptr::null(), |d| d.as_ptr()),
            post_fields_len: self.post_fields.as_ref().map_or(0, |d| d.len()),
        };

        // The sink pointer is only valid for the duration of this call;
        // the executor contract forbids stashing it.
        let mut erased: &mut dyn ChunkSink = sink;
        let mut ffi_sink = FfiChunkSink {
            sink: &mut erased as *mut &mut dyn ChunkSink as *mut c_void,
        };
        let outcome = executor(self.user_data, &view, &mut ffi_sink);

        match outcome.kind {
            FfiOutcomeKind::Success => {
                self.last_status = Some(outcome.status);
                TransferOutcome::Success {
                    status: outcome.status,
                }
            }
            FfiOutcomeKind::Failed => TransferOutcome::Failed {
                code: outcome.code,
                message: copy_message(outcome.message),
            },
            FfiOutcomeKind::Cancelled => TransferOutcome::Cancelled,
        }
    }

    fn query_info(&self, field: InfoField) -> Option<InfoValue> {
        match field {
            InfoField::StatusCode => self.last_status.map(|s| InfoValue::Integer(s as i64)),
            InfoField::EffectiveUrl => self
                .url
                .as_ref()
                .and_then(|u| u.to_str().ok())
                .map(|u| InfoValue::Text(u.to_string())),
            _ => None,
        }
    }

    fn release(&mut self) {
        self.executor = None;
        self.user_data = std::ptr::null_mut();
    }
}
