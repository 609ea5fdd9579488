//! Per-stream connection record.
//!
//! One [`Connection`] exists per live byte stream. It owns the read buffer
//! the deframer operates on; the socket's write half is owned by the
//! transport layer (the server registry entry or the connector slot), so the
//! record never outlives its socket.

use crate::core::deframer::ReadBuffer;
use crate::error::Result;
use crate::utils::crypto::FrameCipher;

/// Mutable per-stream state operated on by the deframer.
///
/// `identity` is the string key `"<address>:<port>"`: the remote endpoint
/// for server-side connections, the connector's own local endpoint for the
/// client role. The asymmetry is inherited from the callers this layer
/// serves.
pub struct Connection {
    identity: String,
    read: ReadBuffer,
}

impl Connection {
    /// Create a record with a fresh, zero-usage read buffer.
    pub fn new(identity: impl Into<String>, capacity: usize, limit: Option<usize>) -> Self {
        Self {
            identity: identity.into(),
            read: ReadBuffer::with_limits(capacity, limit),
        }
    }

    /// The connection's string identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Bytes buffered but not yet consumed by the deframer.
    pub fn buffered(&self) -> usize {
        self.read.used()
    }

    /// Feed one transport delivery through the deframer.
    ///
    /// Accumulates `data`, then drains every frame it completed, handing each
    /// decrypted frame to `sink` in arrival order. An error here is fatal to
    /// the connection: the caller must force-disconnect and stop processing.
    pub fn ingest<F>(&mut self, data: &[u8], cipher: &dyn FrameCipher, sink: F) -> Result<usize>
    where
        F: FnMut(Vec<u8>),
    {
        self.read.accumulate(data)?;
        self.read.drain(cipher, sink)
    }
}
