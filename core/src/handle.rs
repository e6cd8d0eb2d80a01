//! Builder-configured transfer handle with a New -> Armed -> Disposed
//! lifecycle.
//!
//! # Design
//! A `TransferHandle` owns one transport resource and the two buffers that
//! accumulate a response. Configuration methods chain through
//! `Result<&mut Self, _>` and persist across transfers (last write wins);
//! `perform` resets the buffers, replays the configuration into the
//! transport, and assembles a `Response` from the delivered chunks. The
//! state field is an atomic so a `perform` racing a `dispose` fails
//! deterministically with `UseAfterDispose` instead of touching released
//! resources. `Drop` reuses the idempotent dispose path, so the transport
//! is released exactly once on every exit route.

use std::sync::atomic::{AtomicU8, Ordering};

use url::Url;

use crate::buffer::GrowableBuffer;
use crate::error::TransferError;
use crate::info::HandleInfo;
use crate::response::Response;
use crate::transport::{ChunkSink, Method, TransferOption, TransferOutcome, Transport};

const STATE_NEW: u8 = 0;
const STATE_ARMED: u8 = 1;
const STATE_DISPOSED: u8 = 2;

/// Persistent request configuration. Each field is one option slot; setting
/// it again replaces the previous value.
#[derive(Debug, Clone)]
struct RequestConfig {
    url: Option<String>,
    method: Method,
    user_agent: Option<String>,
    referer: Option<String>,
    cookie: Option<String>,
    verify_certificates: bool,
    verbose: bool,
    fail_on_error: bool,
    include_headers_in_body: bool,
    post_fields: Option<Vec<u8>>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            url: None,
            method: Method::Get,
            user_agent: None,
            referer: None,
            cookie: None,
            verify_certificates: true,
            verbose: false,
            fail_on_error: false,
            include_headers_in_body: false,
            post_fields: None,
        }
    }
}

impl RequestConfig {
    /// Flatten the config into the options replayed into the transport.
    /// `include_headers_in_body` is handled at response assembly and is not
    /// forwarded.
    fn options(&self) -> Vec<TransferOption> {
        let mut opts = Vec::new();
        if let Some(url) = &self.url {
            opts.push(TransferOption::Url(url.clone()));
        }
        opts.push(TransferOption::Method(self.method));
        if let Some(agent) = &self.user_agent {
            opts.push(TransferOption::UserAgent(agent.clone()));
        }
        if let Some(referer) = &self.referer {
            opts.push(TransferOption::Referer(referer.clone()));
        }
        if let Some(cookie) = &self.cookie {
            opts.push(TransferOption::Cookie(cookie.clone()));
        }
        opts.push(TransferOption::VerifyCertificates(self.verify_certificates));
        opts.push(TransferOption::Verbose(self.verbose));
        opts.push(TransferOption::FailOnError(self.fail_on_error));
        if let Some(fields) = &self.post_fields {
            opts.push(TransferOption::PostFields(fields.clone()));
        }
        opts
    }
}

/// Feeds delivered chunks into the handle's buffers, remembering the first
/// append failure so `perform` can surface it instead of a truncated
/// response.
struct BufferSink<'a> {
    header: &'a mut GrowableBuffer,
    body: &'a mut GrowableBuffer,
    failed: Option<TransferError>,
}

impl BufferSink<'_> {
    fn push(buffer: &mut GrowableBuffer, chunk: &[u8], failed: &mut Option<TransferError>) -> bool {
        match buffer.append(chunk) {
            Ok(_) => true,
            Err(e) => {
                *failed = Some(e);
                false
            }
        }
    }
}

impl ChunkSink for BufferSink<'_> {
    fn on_header(&mut self, chunk: &[u8]) -> bool {
        Self::push(self.header, chunk, &mut self.failed)
    }

    fn on_body(&mut self, chunk: &[u8]) -> bool {
        Self::push(self.body, chunk, &mut self.failed)
    }
}

/// A stateful, builder-configured descriptor for one transport resource.
///
/// Configure with chained setter calls, run transfers with [`perform`] (or
/// the [`get`]/[`post`] helpers), and release the transport with
/// [`dispose`] or by dropping the handle. A handle is reusable: its
/// configuration persists across transfers until overwritten.
///
/// [`perform`]: TransferHandle::perform
/// [`get`]: TransferHandle::get
/// [`post`]: TransferHandle::post
/// [`dispose`]: TransferHandle::dispose
#[derive(Debug)]
pub struct TransferHandle<T: Transport> {
    state: AtomicU8,
    transport: T,
    config: RequestConfig,
    header_buf: GrowableBuffer,
    body_buf: GrowableBuffer,
    completed: bool,
}

impl<T: Transport> TransferHandle<T> {
    pub fn new(transport: T) -> Self {
        Self {
            state: AtomicU8::new(STATE_NEW),
            transport,
            config: RequestConfig::default(),
            header_buf: GrowableBuffer::new(),
            body_buf: GrowableBuffer::new(),
            completed: false,
        }
    }

    /// Check the lifecycle state, arming a fresh handle on first touch.
    /// Arming happens at most once; a disposed handle always fails here
    /// before any mutation takes place.
    fn ensure_live(&self) -> Result<(), TransferError> {
        match self.state.compare_exchange(
            STATE_NEW,
            STATE_ARMED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) | Err(STATE_ARMED) => Ok(()),
            Err(_) => Err(TransferError::UseAfterDispose),
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_DISPOSED
    }

    pub(crate) fn has_completed(&self) -> bool {
        self.completed
    }

    /// The transport backing this handle.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport, e.g. to rescript a test double
    /// between transfers. Never call this while a transfer is in flight
    /// (the borrow checker already forbids it from safe code).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Set the target URL. The setting persists until the next call; note
    /// that [`get`](TransferHandle::get) and
    /// [`post`](TransferHandle::post) may also change it.
    ///
    /// The URL must be absolute; a malformed value fails here, at the call
    /// site, with `InvalidConfiguration`.
    pub fn set_url(&mut self, url: &str) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        Url::parse(url)
            .map_err(|e| TransferError::InvalidConfiguration(format!("url {url:?}: {e}")))?;
        self.config.url = Some(url.to_string());
        Ok(self)
    }

    pub fn set_user_agent(&mut self, agent: &str) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        self.config.user_agent = Some(agent.to_string());
        Ok(self)
    }

    pub fn set_referer(&mut self, referer: &str) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        self.config.referer = Some(referer.to_string());
        Ok(self)
    }

    /// Set the cookie sent with the next transfer, formatted `name=value;`.
    /// The handle carries a single cookie option; calling this again
    /// replaces it.
    pub fn set_cookie(&mut self, name: &str, value: &str) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        self.config.cookie = Some(format!("{name}={value};"));
        Ok(self)
    }

    /// Control TLS certificate verification. Enabled by default.
    pub fn set_verify_certificates(&mut self, enabled: bool) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        self.config.verify_certificates = enabled;
        Ok(self)
    }

    /// Emit transfer tracing at debug level instead of trace level.
    pub fn set_verbose(&mut self, enabled: bool) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        self.config.verbose = enabled;
        Ok(self)
    }

    /// Treat HTTP status >= 400 as a transfer failure instead of an
    /// ordinary `Response`.
    pub fn set_fail_on_error(&mut self, enabled: bool) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        self.config.fail_on_error = enabled;
        Ok(self)
    }

    /// Prepend the raw header text to the response body, the way curl's
    /// header option folds headers into the output stream.
    pub fn set_include_headers_in_body(
        &mut self,
        enabled: bool,
    ) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        self.config.include_headers_in_body = enabled;
        Ok(self)
    }

    pub fn set_method(&mut self, method: Method) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        self.config.method = method;
        Ok(self)
    }

    /// Set the encoded form body for a POST. The content length sent to the
    /// transport is the byte length of `fields`, so multi-byte characters
    /// never truncate the request body.
    pub fn set_post_fields(&mut self, fields: &str) -> Result<&mut Self, TransferError> {
        self.set_post_fields_bytes(fields.as_bytes())
    }

    /// Byte-level variant of [`set_post_fields`](TransferHandle::set_post_fields)
    /// for callers that already hold the encoded body.
    pub fn set_post_fields_bytes(&mut self, fields: &[u8]) -> Result<&mut Self, TransferError> {
        self.ensure_live()?;
        self.config.post_fields = Some(fields.to_vec());
        Ok(self)
    }

    /// Run the configured transfer and return the assembled response.
    ///
    /// Both buffers are reset first, so a reused handle never leaks bytes
    /// from an earlier transfer. A non-2xx status is an ordinary `Response`
    /// unless fail-on-error is set; engine failures, cancellation, and
    /// buffer allocation failure never yield a partial `Response`.
    pub fn perform(&mut self) -> Result<Response, TransferError> {
        self.ensure_live()?;
        self.header_buf.reset();
        self.body_buf.reset();

        let verbose = self.config.verbose;
        for option in self.config.options() {
            if verbose {
                log::debug!("configure {option:?}");
            } else {
                log::trace!("configure {option:?}");
            }
            self.transport.configure(&option)?;
        }

        let mut sink = BufferSink {
            header: &mut self.header_buf,
            body: &mut self.body_buf,
            failed: None,
        };
        let outcome = self.transport.execute(&mut sink);
        let sink_failure = sink.failed.take();

        match outcome {
            TransferOutcome::Success { status } => {
                if let Some(err) = sink_failure {
                    return Err(err);
                }
                if verbose {
                    log::debug!(
                        "transfer complete: status={status} header_bytes={} body_bytes={}",
                        self.header_buf.len(),
                        self.body_buf.len()
                    );
                } else {
                    log::trace!("transfer complete: status={status}");
                }
                self.completed = true;
                if self.config.fail_on_error && status >= 400 {
                    return Err(TransferError::HttpError {
                        status,
                        message: format!("server returned {status} with fail-on-error set"),
                    });
                }
                let header = self.header_buf.snapshot_as_text();
                let mut body = self.body_buf.snapshot_as_text();
                if self.config.include_headers_in_body {
                    body = format!("{header}{body}");
                }
                Ok(Response::new(status, header, body))
            }
            TransferOutcome::Failed { code, message } => {
                Err(sink_failure.unwrap_or(TransferError::Engine { code, message }))
            }
            TransferOutcome::Cancelled => Err(TransferError::Cancelled),
        }
    }

    /// Execute an HTTP GET against `url` (or the currently configured URL)
    /// and return the response.
    pub fn get(&mut self, url: Option<&str>) -> Result<Response, TransferError> {
        self.get_with(url, |_| Ok(()))
    }

    /// Like [`get`](TransferHandle::get), applying `setup` to the handle
    /// before performing.
    pub fn get_with<F>(&mut self, url: Option<&str>, setup: F) -> Result<Response, TransferError>
    where
        F: FnOnce(&mut Self) -> Result<(), TransferError>,
    {
        self.set_method(Method::Get)?;
        if let Some(url) = url {
            self.set_url(url)?;
        }
        setup(self)?;
        self.perform()
    }

    /// Execute an HTTP POST, optionally updating the URL and form fields
    /// first.
    pub fn post(
        &mut self,
        url: Option<&str>,
        fields: Option<&str>,
    ) -> Result<Response, TransferError> {
        self.post_with(url, fields, |_| Ok(()))
    }

    /// Like [`post`](TransferHandle::post), applying `setup` to the handle
    /// before performing.
    pub fn post_with<F>(
        &mut self,
        url: Option<&str>,
        fields: Option<&str>,
        setup: F,
    ) -> Result<Response, TransferError>
    where
        F: FnOnce(&mut Self) -> Result<(), TransferError>,
    {
        self.set_method(Method::Post)?;
        if let Some(url) = url {
            self.set_url(url)?;
        }
        if let Some(fields) = fields {
            self.set_post_fields(fields)?;
        }
        setup(self)?;
        self.perform()
    }

    /// Percent-encode `text` via the transport's escape routine.
    pub fn url_encode(&self, text: &str) -> Result<String, TransferError> {
        if self.is_disposed() {
            return Err(TransferError::UseAfterDispose);
        }
        Ok(self.transport.escape(text))
    }

    /// Metadata view over the most recently completed transfer.
    pub fn info(&self) -> HandleInfo<'_, T> {
        HandleInfo::new(self)
    }

    /// Release the transport resource. Irreversible; any further operation
    /// fails with `UseAfterDispose`. Calling dispose again is a no-op.
    pub fn dispose(&mut self) {
        let prev = self.state.swap(STATE_DISPOSED, Ordering::AcqRel);
        if prev != STATE_DISPOSED {
            self.transport.release();
        }
    }

    /// Run `op` against this handle, then dispose it on every exit path.
    pub fn use_once<R, F>(mut self, op: F) -> Result<R, TransferError>
    where
        F: FnOnce(&mut Self) -> Result<R, TransferError>,
    {
        let result = op(&mut self);
        self.dispose();
        result
    }
}

impl<T: Transport> Drop for TransferHandle<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
