//! # Error Types
//!
//! Error handling for the framing layer.
//!
//! This module defines all error variants that can occur while framing,
//! deframing, and shuttling messages over a connection.
//!
//! ## Error Categories
//! - **I/O Errors**: socket and transport failures
//! - **Protocol Errors**: malformed frame headers, oversized frames
//! - **Internal Errors**: buffer-accounting invariant breaches
//! - **Lookup Errors**: operations against connections that no longer exist
//!
//! All errors implement `std::error::Error` for interoperability. Fatal
//! conditions are always local to a single connection; they never abort the
//! listener or any other connection.

use std::io;
use thiserror::Error;

/// Primary error type for all framing-layer operations.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// A frame header declared a total length below the 2-byte minimum.
    /// Fatal to the connection; buffered bytes after the bad header are
    /// discarded along with it.
    #[error("invalid frame length {0} (minimum is 2)")]
    BadFrameLength(u16),

    /// An outbound message serialized to more than a u16 length prefix can
    /// describe.
    #[error("frame too large: {0} bytes (maximum is 65535)")]
    OversizedFrame(usize),

    /// The configured read-buffer ceiling was hit before a frame completed.
    #[error("read buffer limit exceeded: need {needed} bytes, limit is {limit}")]
    BufferLimit { needed: usize, limit: usize },

    /// Remaining-byte accounting underflowed after compaction. This is an
    /// internal invariant breach, not a recoverable network condition.
    #[error("buffer accounting fault: frame length {frame_len} exceeds {buffered} buffered bytes")]
    BufferAccounting { frame_len: usize, buffered: usize },

    #[error("no connection registered for {0}")]
    ConnectionMissing(String),

    #[error("connector is not connected")]
    NotConnected,

    #[error("operation timed out")]
    Timeout,

    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using `FramingError`.
pub type Result<T> = std::result::Result<T, FramingError>;
