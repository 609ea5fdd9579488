//! Application message envelope.
//!
//! The framing layer is deliberately schema-light: the only structure it
//! imposes on a payload is an [`Envelope`] carrying a numeric id (stamped by
//! the send paths), a kind string used for handler routing, and an opaque
//! body the application interprets. Envelopes are encoded with bincode.

use serde::{Deserialize, Serialize};

/// One application message as carried inside a frame payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message id, stamped by `send`/`broadcast` before the envelope reaches
    /// the wire. Zero until stamped.
    pub id: u64,

    /// Routing key: which handler processes this message.
    pub kind: String,

    /// Opaque application body.
    pub body: Vec<u8>,
}

impl Envelope {
    /// Build an unstamped envelope.
    pub fn new(kind: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: 0,
            kind: kind.into(),
            body: body.into(),
        }
    }
}
