//! The transport seam: everything the core delegates instead of owning.
//!
//! # Design
//! The core never performs network I/O. A `Transport` receives the handle's
//! configuration one option at a time, executes the exchange while pushing
//! header and body chunks into a `ChunkSink`, and answers post-transfer
//! metadata queries. Connection handling, TLS, redirects, and DNS all live
//! behind this trait.
//!
//! `ScriptedTransport` is the deterministic in-memory implementation used
//! by the core's own tests and available to code built on top of it. A real
//! network transport lives outside the core; `core/tests/integration.rs`
//! provides one backed by ureq.

use std::collections::HashMap;

use crate::error::TransferError;
use crate::info::{InfoField, InfoValue};

/// HTTP method selected for the next transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// One transport-level configuration item, replayed from the handle's
/// config at the start of each transfer. Last-write-wins is already applied
/// by the handle; a transport sees at most one value per option.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOption {
    Url(String),
    Method(Method),
    UserAgent(String),
    Referer(String),
    /// Full cookie string, formatted `name=value;`.
    Cookie(String),
    VerifyCertificates(bool),
    Verbose(bool),
    FailOnError(bool),
    /// Encoded request body. Content length is the byte length of this
    /// data, never a character count.
    PostFields(Vec<u8>),
}

/// Receives response bytes during a transfer, in arrival order.
///
/// Returning `false` tells the transport to stop delivering and abandon
/// the exchange; the handle records why before refusing a chunk.
pub trait ChunkSink {
    fn on_header(&mut self, chunk: &[u8]) -> bool;
    fn on_body(&mut self, chunk: &[u8]) -> bool;
}

/// Terminal result of one `Transport::execute` call.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// The exchange ran to completion; `status` is the HTTP status code.
    /// An HTTP error status is still a successful transfer.
    Success { status: u16 },
    /// The engine failed before or during the exchange.
    Failed { code: i32, message: String },
    /// The exchange was cancelled before completion.
    Cancelled,
}

/// External collaborator performing the actual network exchange.
///
/// One transport instance backs one `TransferHandle`; the handle's
/// single-call-at-a-time discipline means no method is ever re-entered.
pub trait Transport {
    /// Apply one configuration item for the upcoming transfer. Options a
    /// transport has no use for should be accepted and ignored.
    fn configure(&mut self, option: &TransferOption) -> Result<(), TransferError>;

    /// Run the exchange, pushing header and body chunks into `sink` in
    /// arrival order, then report the terminal outcome. Delivery must stop
    /// as soon as the sink refuses a chunk.
    fn execute(&mut self, sink: &mut dyn ChunkSink) -> TransferOutcome;

    /// Metadata for the most recently completed transfer, or `None` when
    /// the field is unknown or unsupported.
    fn query_info(&self, field: InfoField) -> Option<InfoValue>;

    /// Percent-encode `text` for safe inclusion in a URL.
    fn escape(&self, text: &str) -> String {
        urlencoding::encode(text).into_owned()
    }

    /// Release transport-side resources. Called exactly once, at dispose.
    fn release(&mut self) {}
}

/// Deterministic transport for tests: records every configure call and
/// replays a scripted response on each execute.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    status: u16,
    header_chunks: Vec<Vec<u8>>,
    body_chunks: Vec<Vec<u8>>,
    failure: Option<(i32, String)>,
    cancelled: bool,
    info: HashMap<InfoField, InfoValue>,
    /// Configure calls in arrival order, across all transfers.
    pub options: Vec<TransferOption>,
    /// Number of completed execute calls.
    pub executions: usize,
}

impl ScriptedTransport {
    /// Script a successful transfer with the given status code. The status
    /// is also published through `query_info`.
    pub fn with_status(status: u16) -> Self {
        let mut t = Self {
            status,
            ..Self::default()
        };
        t.info
            .insert(InfoField::StatusCode, InfoValue::Integer(status as i64));
        t
    }

    /// Script an engine failure.
    pub fn failing(code: i32, message: &str) -> Self {
        Self {
            failure: Some((code, message.to_string())),
            ..Self::default()
        }
    }

    /// Script a cancelled transfer.
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }

    pub fn header_chunk(mut self, chunk: &[u8]) -> Self {
        self.header_chunks.push(chunk.to_vec());
        self
    }

    pub fn body_chunk(mut self, chunk: &[u8]) -> Self {
        self.body_chunks.push(chunk.to_vec());
        self
    }

    /// Publish a metadata field through `query_info`.
    pub fn info(mut self, field: InfoField, value: InfoValue) -> Self {
        self.info.insert(field, value);
        self
    }

    /// Replace the scripted response, e.g. between two performs.
    pub fn rescript(&mut self, status: u16, header: &[u8], body: &[u8]) {
        self.status = status;
        self.header_chunks = vec![header.to_vec()];
        self.body_chunks = vec![body.to_vec()];
        self.failure = None;
        self.cancelled = false;
        self.info
            .insert(InfoField::StatusCode, InfoValue::Integer(status as i64));
    }

    /// The most recent value configured for the method option, if any.
    pub fn configured_method(&self) -> Option<Method> {
        self.options.iter().rev().find_map(|o| match o {
            TransferOption::Method(m) => Some(*m),
            _ => None,
        })
    }

    /// The most recent post fields configured, if any.
    pub fn configured_post_fields(&self) -> Option<&[u8]> {
        self.options.iter().rev().find_map(|o| match o {
            TransferOption::PostFields(data) => Some(data.as_slice()),
            _ => None,
        })
    }
}

impl Transport for ScriptedTransport {
    fn configure(&mut self, option: &TransferOption) -> Result<(), TransferError> {
        self.options.push(option.clone());
        Ok(())
    }

    fn execute(&mut self, sink: &mut dyn ChunkSink) -> TransferOutcome {
        self.executions += 1;
        if self.cancelled {
            return TransferOutcome::Cancelled;
        }
        if let Some((code, message)) = &self.failure {
            return TransferOutcome::Failed {
                code: *code,
                message: message.clone(),
            };
        }
        for chunk in &self.header_chunks {
            if !sink.on_header(chunk) {
                return TransferOutcome::Failed {
                    code: -1,
                    message: "header sink refused chunk".to_string(),
                };
            }
        }
        for chunk in &self.body_chunks {
            if !sink.on_body(chunk) {
                return TransferOutcome::Failed {
                    code: -1,
                    message: "body sink refused chunk".to_string(),
                };
            }
        }
        TransferOutcome::Success {
            status: self.status,
        }
    }

    fn query_info(&self, field: InfoField) -> Option<InfoValue> {
        self.info.get(&field).cloned()
    }
}
