//! # Server (listener role)
//!
//! Accept loop plus a registry of connection records keyed by remote-endpoint
//! identity.
//!
//! Each accepted connection gets its own read task; its buffers are touched
//! only there, so deframing needs no locking. The registry (the shared map
//! from identity to write half and cancellation token) is behind an async
//! mutex, explicitly serializing accept, send, broadcast, and teardown.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::core::connection::Connection;
use crate::error::{FramingError, Result};
use crate::protocol::reactor::{respond, HandlerTable, Reactor};
use crate::protocol::Envelope;
use crate::transport::{is_expected_disconnect, LifecycleHooks, READ_CHUNK};
use crate::utils::crypto::FrameCipher;

/// Registry entry: the write half and the kill switch for one connection.
struct ConnectionHandle {
    writer: Arc<Mutex<OwnedWriteHalf>>,
    cancel: CancellationToken,
}

type Registry = Arc<Mutex<HashMap<String, ConnectionHandle>>>;

/// Listener-role endpoint multiplexing many independently framed
/// connections.
pub struct Server<R: Reactor> {
    config: ServerConfig,
    reactor: Arc<R>,
    cipher: Arc<dyn FrameCipher>,
    registry: Registry,
    accept_cancel: Mutex<Option<CancellationToken>>,
}

impl<R: Reactor> Server<R> {
    pub fn new(config: ServerConfig, reactor: Arc<R>, cipher: Arc<dyn FrameCipher>) -> Self {
        Self {
            config,
            reactor,
            cipher,
            registry: Arc::new(Mutex::new(HashMap::new())),
            accept_cancel: Mutex::new(None),
        }
    }

    /// Bind the listener and begin accepting connections.
    ///
    /// Installs `handlers` on the reactor and returns the bound address
    /// (useful with port 0). Each accepted connection is registered under
    /// its remote endpoint `"<ip>:<port>"` before the connect hook fires.
    pub async fn start(
        &self,
        port: u16,
        handlers: HandlerTable,
        hooks: LifecycleHooks,
    ) -> Result<SocketAddr> {
        self.reactor.configure(handlers);

        let mut slot = self.accept_cancel.lock().await;
        if slot.is_some() {
            return Err(FramingError::ConfigError(
                "server is already started".to_string(),
            ));
        }

        let listener =
            TcpListener::bind(format!("{}:{port}", self.config.bind_address)).await?;
        let bound = listener.local_addr()?;
        info!(address = %bound, "listening");

        let cancel = CancellationToken::new();
        *slot = Some(cancel.clone());
        drop(slot);

        let registry = self.registry.clone();
        let reactor = self.reactor.clone();
        let cipher = self.cipher.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(address = %bound, "listener shut down");
                        break;
                    }
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            let live = registry.lock().await.len();
                            if live >= config.max_connections {
                                warn!(peer = %peer, live, "connection limit reached, refusing");
                                continue;
                            }

                            spawn_connection(
                                stream,
                                peer,
                                registry.clone(),
                                reactor.clone(),
                                cipher.clone(),
                                hooks.clone(),
                                &config,
                            )
                            .await;
                        }
                        Err(e) => {
                            error!(error = %e, "accept failed");
                        }
                    },
                }
            }
        });

        Ok(bound)
    }

    /// Stamp `message.id` and write the envelope to one connection.
    ///
    /// Fails with [`FramingError::ConnectionMissing`] if the identity is not
    /// registered.
    pub async fn send(&self, identity: &str, message_id: u64, mut message: Envelope) -> Result<()> {
        let writer = {
            let registry = self.registry.lock().await;
            registry
                .get(identity)
                .ok_or_else(|| FramingError::ConnectionMissing(identity.to_string()))?
                .writer
                .clone()
        };

        message.id = message_id;
        let mut writer = writer.lock().await;
        respond(self.reactor.as_ref(), &mut writer, &message).await
    }

    /// Stamp `message.id` once and write the envelope to every live
    /// connection.
    ///
    /// A failed write is logged and skipped; it never aborts the remaining
    /// sends. Returns the number of connections written successfully. Errors
    /// only if the envelope itself cannot be encoded.
    pub async fn broadcast(&self, message_id: u64, mut message: Envelope) -> Result<usize> {
        message.id = message_id;
        let frame = self.reactor.encode(&message)?;

        let targets: Vec<(String, Arc<Mutex<OwnedWriteHalf>>)> = {
            let registry = self.registry.lock().await;
            registry
                .iter()
                .map(|(id, handle)| (id.clone(), handle.writer.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (identity, writer) in targets {
            let mut writer = writer.lock().await;
            match tokio::io::AsyncWriteExt::write_all(&mut *writer, &frame).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(peer = %identity, error = %e, "broadcast write failed"),
            }
        }

        Ok(delivered)
    }

    /// Force a transport-level disconnect for one identity.
    ///
    /// Registry removal happens on the connection's close path, not here.
    /// Returns `false` if the identity is not registered (a no-op, not a
    /// fault).
    pub async fn close_connection(&self, identity: &str) -> bool {
        let registry = self.registry.lock().await;
        match registry.get(identity) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of currently registered connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Close the listener and force-disconnect every registered connection.
    /// Safe to call when no listener is active.
    pub async fn stop(&self) {
        if let Some(cancel) = self.accept_cancel.lock().await.take() {
            cancel.cancel();
        }

        let registry = self.registry.lock().await;
        for handle in registry.values() {
            handle.cancel.cancel();
        }
    }
}

/// Register an accepted stream and spawn its read task.
async fn spawn_connection<R: Reactor>(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Registry,
    reactor: Arc<R>,
    cipher: Arc<dyn FrameCipher>,
    hooks: LifecycleHooks,
    config: &ServerConfig,
) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
    }

    let identity = peer.to_string();
    info!(peer = %identity, "connected");

    let (mut reader, writer) = stream.into_split();
    let cancel = CancellationToken::new();

    registry.lock().await.insert(
        identity.clone(),
        ConnectionHandle {
            writer: Arc::new(Mutex::new(writer)),
            cancel: cancel.clone(),
        },
    );

    hooks.connected(&identity);

    let capacity = config.read_buffer_capacity;
    let limit = config.max_buffer_bytes;
    let idle = config.idle_timeout;

    tokio::spawn(async move {
        let mut conn = Connection::new(identity.clone(), capacity, limit);
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                delivered = read_delivery(&mut reader, &mut chunk, idle) => match delivered {
                    Ok(Some(0)) => break, // peer closed
                    Ok(Some(n)) => {
                        // A delivery for an identity already torn down is
                        // silently dropped.
                        if !registry.lock().await.contains_key(&identity) {
                            break;
                        }

                        let drained = conn.ingest(&chunk[..n], cipher.as_ref(), |frame| {
                            reactor.dispatch(&identity, frame);
                        });
                        if let Err(e) = drained {
                            error!(peer = %identity, error = %e, "fatal framing error, disconnecting");
                            break;
                        }
                    }
                    Ok(None) => {
                        warn!(peer = %identity, "idle timeout");
                        break;
                    }
                    Err(e) => {
                        if is_expected_disconnect(&e) {
                            debug!(peer = %identity, error = %e, "connection error");
                        } else {
                            error!(peer = %identity, error = %e, "transport error");
                        }
                        break;
                    }
                },
            }
        }

        // Close path. Removing an already-absent entry is a no-op, and the
        // disconnect hook fires at most once per registered connection.
        let removed = registry.lock().await.remove(&identity);
        if removed.is_some() {
            hooks.disconnected(&identity);
            debug!(peer = %identity, "closed");
        }
    });
}

/// One socket read, bounded by the idle timeout when configured.
///
/// `Ok(None)` signals the idle timeout elapsed with no delivery.
async fn read_delivery(
    reader: &mut OwnedReadHalf,
    buf: &mut [u8],
    idle: Option<Duration>,
) -> io::Result<Option<usize>> {
    match idle {
        Some(window) => match tokio::time::timeout(window, reader.read(buf)).await {
            Ok(read) => read.map(Some),
            Err(_) => Ok(None),
        },
        None => reader.read(buf).await.map(Some),
    }
}
