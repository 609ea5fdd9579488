//! # Reactor Boundary
//!
//! The dispatch/serialization boundary between the framing core and
//! application logic.
//!
//! The transports consume this boundary, they do not implement it: every
//! decoded inbound frame is handed to [`Reactor::dispatch`] tagged with the
//! owning connection's identity, and every outbound envelope goes through
//! [`respond`], which serializes, frames, encrypts, and writes in one step.
//!
//! [`DispatchReactor`] is the bundled implementation: a handler table keyed
//! by message kind, with zero-copy routing for statically known kinds.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::warn;

use crate::core::frame::{encode_frame, HEADER_LEN};
use crate::error::Result;
use crate::protocol::message::Envelope;
use crate::utils::crypto::FrameCipher;

/// Handler invoked for one inbound envelope, tagged with the identity of the
/// connection it arrived on.
pub type Handler = Arc<dyn Fn(&str, &Envelope) + Send + Sync + 'static>;

/// Mapping from message kind to application logic, installed at `start`.
pub type HandlerTable = HashMap<Cow<'static, str>, Handler>;

/// The boundary both transports hand frames to and serialize messages
/// through.
pub trait Reactor: Send + Sync + 'static {
    /// Install the mapping from message kind to application logic.
    /// Called once by `Connector::start` / `Server::start`.
    fn configure(&self, handlers: HandlerTable);

    /// Deliver one inbound frame (header intact, payload decrypted) from the
    /// named connection.
    fn dispatch(&self, identity: &str, frame: Vec<u8>);

    /// Serialize and encrypt one outbound envelope into a wire-ready frame.
    fn encode(&self, message: &Envelope) -> Result<Bytes>;
}

/// Serialize, encrypt, and write one outbound envelope onto a connection.
///
/// This is the complete outbound path; the write suspends until the
/// transport has accepted the bytes, which is what paces a fast sender
/// against a slow peer.
pub async fn respond<R: Reactor + ?Sized>(
    reactor: &R,
    writer: &mut OwnedWriteHalf,
    message: &Envelope,
) -> Result<()> {
    let frame = reactor.encode(message)?;
    writer.write_all(&frame).await?;
    Ok(())
}

/// Handler-table reactor with per-kind routing.
pub struct DispatchReactor {
    handlers: RwLock<HandlerTable>,
    cipher: Arc<dyn FrameCipher>,
}

impl DispatchReactor {
    pub fn new(cipher: Arc<dyn FrameCipher>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            cipher,
        }
    }

    /// Register a single handler, replacing any previous one for the kind.
    pub fn register<F>(&self, kind: impl Into<Cow<'static, str>>, handler: F)
    where
        F: Fn(&str, &Envelope) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.insert(kind.into(), Arc::new(handler));
        }
    }
}

impl Reactor for DispatchReactor {
    fn configure(&self, table: HandlerTable) {
        match self.handlers.write() {
            Ok(mut handlers) => *handlers = table,
            Err(_) => warn!("handler table lock poisoned; configuration dropped"),
        }
    }

    fn dispatch(&self, identity: &str, frame: Vec<u8>) {
        if frame.len() < HEADER_LEN {
            warn!(peer = %identity, len = frame.len(), "truncated frame dropped");
            return;
        }

        let envelope: Envelope = match bincode::deserialize(&frame[HEADER_LEN..]) {
            Ok(env) => env,
            Err(e) => {
                warn!(peer = %identity, error = %e, "undecodable frame dropped");
                return;
            }
        };

        // Clone the handler out and release the lock before invoking, so a
        // handler is free to call `register` without deadlocking.
        let handler = match self.handlers.read() {
            Ok(handlers) => handlers.get(envelope.kind.as_str()).cloned(),
            Err(_) => {
                warn!("handler table lock poisoned; frame dropped");
                return;
            }
        };

        match handler {
            Some(handler) => handler(identity, &envelope),
            None => warn!(peer = %identity, kind = %envelope.kind, "no handler for message kind"),
        }
    }

    fn encode(&self, message: &Envelope) -> Result<Bytes> {
        let payload = bincode::serialize(message)?;
        encode_frame(&payload, self.cipher.as_ref())
    }
}
