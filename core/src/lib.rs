//! Transport-agnostic HTTP transfer-handle core.
//!
//! # Overview
//! A builder-style handle for configuring and executing HTTP requests,
//! accumulating chunked response data, and managing the lifetime of the
//! underlying transport resource. The actual network exchange (connections,
//! TLS, DNS, redirects) is delegated to a [`Transport`] collaborator; this
//! crate owns the request configuration, the response-buffer accumulation,
//! and the handle's New -> Armed -> Disposed lifecycle.
//!
//! # Design
//! - `TransferHandle` owns one transport plus the header and body buffers;
//!   configuration persists across transfers, last write wins.
//! - `GrowableBuffer` assembles arbitrarily sized chunks in arrival order
//!   and surfaces allocation failure instead of truncating.
//! - `HandleInfo` is a lazy metadata view dispatching over a closed
//!   `InfoField` set; absence is an error, never a zero sentinel.
//! - `ScriptedTransport` gives tests a deterministic transport; the real
//!   one is supplied by the embedding application.

pub mod buffer;
pub mod error;
pub mod handle;
pub mod info;
pub mod response;
pub mod transport;

pub use buffer::GrowableBuffer;
pub use error::TransferError;
pub use handle::TransferHandle;
pub use info::{HandleInfo, InfoField, InfoValue};
pub use response::Response;
pub use transport::{
    ChunkSink, Method, ScriptedTransport, TransferOption, TransferOutcome, Transport,
};
