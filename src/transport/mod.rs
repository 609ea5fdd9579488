//! # Transports
//!
//! The two roles of the framing layer over TCP.
//!
//! ## Components
//! - **Connector**: client role, exactly one persistent outbound connection
//! - **Server**: listener role, many concurrent inbound connections keyed by
//!   remote-endpoint identity
//!
//! Both roles run each connection's signals (data, timeout, error, close) on
//! a single task, so a connection's buffers are never touched concurrently.
//! Cross-connection state lives behind async mutexes.

use std::io;
use std::sync::Arc;

pub mod connector;
pub mod server;

pub use connector::Connector;
pub use server::Server;

/// Size of the scratch buffer for one socket read.
pub(crate) const READ_CHUNK: usize = 16 * 1024;

/// Callback invoked with a connection identity.
pub type IdentityHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional connect/disconnect callbacks.
///
/// Any state the callbacks need is captured in their closures at
/// construction time.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    on_connect: Option<IdentityHook>,
    on_disconnect: Option<IdentityHook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke `hook(identity)` once a connection is established.
    pub fn on_connect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(hook));
        self
    }

    /// Invoke `hook(identity)` once a connection has closed, regardless of
    /// whether the close was error-triggered.
    pub fn on_disconnect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(hook));
        self
    }

    pub(crate) fn connected(&self, identity: &str) {
        if let Some(hook) = &self.on_connect {
            hook(identity);
        }
    }

    pub(crate) fn disconnected(&self, identity: &str) {
        if let Some(hook) = &self.on_disconnect {
            hook(identity);
        }
    }
}

/// Expected network conditions that do not warrant error-level logging:
/// resets, refusals, unreachable hosts, and timeouts.
pub(crate) fn is_expected_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::TimedOut
    )
}
