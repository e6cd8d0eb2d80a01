//! Append-only byte accumulator for response data.
//!
//! # Design
//! A transfer delivers header and body bytes in arbitrarily sized chunks.
//! `GrowableBuffer` assembles them in arrival order and hands out a textual
//! snapshot once the transfer completes. `reset` keeps the backing capacity
//! so a handle reused across transfers does not reallocate from scratch.
//! Allocation failure is surfaced as `OutOfMemory` instead of truncating
//! the response.

use crate::error::TransferError;

/// Growable accumulator for chunked response bytes.
///
/// Appends preserve everything delivered since the last `reset`; the buffer
/// content is always the concatenation of all appended chunks in order.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Append `chunk` and return the new logical length.
    ///
    /// Capacity is reserved through `try_reserve`, so an allocation failure
    /// comes back as `TransferError::OutOfMemory` rather than aborting the
    /// process. On error the buffer keeps its previous contents.
    pub fn append(&mut self, chunk: &[u8]) -> Result<usize, TransferError> {
        self.data
            .try_reserve(chunk.len())
            .map_err(|_| TransferError::OutOfMemory)?;
        self.data.extend_from_slice(chunk);
        Ok(self.data.len())
    }

    /// Logically empty the buffer. Backing capacity is retained for reuse.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Current logical length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw contents since the last `reset`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Textual copy of the current contents. Invalid UTF-8 sequences are
    /// replaced rather than rejected; the buffer itself is untouched.
    pub fn snapshot_as_text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
