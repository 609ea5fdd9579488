//! # Connector (client role)
//!
//! Owns exactly one persistent outbound connection and one reactor instance.
//!
//! The connector identifies its connection by its own *local* endpoint
//! (`"<address>:<port>"`), not the remote server's: it has exactly one
//! connection, so the identity is a handle, not a routing key. Server-side
//! connections use the remote endpoint instead; see
//! [`Server`](crate::transport::Server).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::config::ConnectorConfig;
use crate::core::connection::Connection;
use crate::error::{FramingError, Result};
use crate::protocol::reactor::{respond, HandlerTable, Reactor};
use crate::protocol::Envelope;
use crate::transport::{LifecycleHooks, READ_CHUNK};
use crate::utils::crypto::FrameCipher;

struct ClientState {
    identity: String,
    generation: u64,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    cancel: CancellationToken,
}

/// Client-role wrapper around one connection record.
pub struct Connector<R: Reactor> {
    config: ConnectorConfig,
    reactor: Arc<R>,
    cipher: Arc<dyn FrameCipher>,
    state: Arc<Mutex<Option<ClientState>>>,
    generation: AtomicU64,
}

impl<R: Reactor> Connector<R> {
    pub fn new(config: ConnectorConfig, reactor: Arc<R>, cipher: Arc<dyn FrameCipher>) -> Self {
        Self {
            config,
            reactor,
            cipher,
            state: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Connect to `host:port` and begin deframing inbound bytes.
    ///
    /// Installs `handlers` on the reactor, connects with the configured
    /// timeout, invokes the connect hook with the derived local-endpoint
    /// identity, and spawns the read loop. Returns the identity.
    ///
    /// The disconnect hook fires exactly once when the connection ends, for
    /// any reason, including [`stop`](Self::stop).
    pub async fn start(
        &self,
        host: &str,
        port: u16,
        handlers: HandlerTable,
        hooks: LifecycleHooks,
    ) -> Result<String> {
        self.reactor.configure(handlers);

        let mut slot = self.state.lock().await;
        if slot.is_some() {
            return Err(FramingError::ConfigError(
                "connector is already started".to_string(),
            ));
        }

        let stream = timeout(
            self.config.connect_timeout,
            TcpStream::connect((host, port)),
        )
        .await
        .map_err(|_| FramingError::Timeout)??;
        stream.set_nodelay(true)?;

        let identity = stream.local_addr()?.to_string();
        debug!(host, port, id = %identity, "connected");

        let (mut reader, writer) = stream.into_split();
        let cancel = CancellationToken::new();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        *slot = Some(ClientState {
            identity: identity.clone(),
            generation,
            writer: Arc::new(Mutex::new(writer)),
            cancel: cancel.clone(),
        });
        drop(slot);

        hooks.connected(&identity);

        let reactor = self.reactor.clone();
        let cipher = self.cipher.clone();
        let state = self.state.clone();
        let capacity = self.config.read_buffer_capacity;
        let limit = self.config.max_buffer_bytes;
        let task_identity = identity.clone();

        tokio::spawn(async move {
            let mut conn = Connection::new(task_identity.clone(), capacity, limit);
            let mut chunk = vec![0u8; READ_CHUNK];

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    read = reader.read(&mut chunk) => match read {
                        Ok(0) => break,
                        Ok(n) => {
                            let drained = conn.ingest(&chunk[..n], cipher.as_ref(), |frame| {
                                reactor.dispatch(&task_identity, frame);
                            });
                            if let Err(e) = drained {
                                error!(id = %task_identity, error = %e, "fatal framing error, disconnecting");
                                break;
                            }
                        }
                        Err(e) => {
                            error!(id = %task_identity, error = %e, "transport error");
                            break;
                        }
                    },
                }
            }

            // Close path: clear the slot, but only while it still holds this
            // connection. A stop()/start() pair may have installed a
            // successor before this task got polled; its state must survive.
            {
                let mut slot = state.lock().await;
                if slot.as_ref().is_some_and(|s| s.generation == generation) {
                    slot.take();
                }
            }
            debug!(id = %task_identity, "closed");
            hooks.disconnected(&task_identity);
        });

        Ok(identity)
    }

    /// Stamp `message.id` and write the envelope onto the owned socket.
    pub async fn send(&self, message_id: u64, mut message: Envelope) -> Result<()> {
        let writer = {
            let slot = self.state.lock().await;
            slot.as_ref()
                .ok_or(FramingError::NotConnected)?
                .writer
                .clone()
        };

        message.id = message_id;
        let mut writer = writer.lock().await;
        respond(self.reactor.as_ref(), &mut writer, &message).await
    }

    /// Identity of the live connection, if any.
    pub async fn identity(&self) -> Option<String> {
        self.state.lock().await.as_ref().map(|s| s.identity.clone())
    }

    /// Tear the connection down: abort the read loop, then shut the socket.
    /// Safe to call when already stopped.
    pub async fn stop(&self) {
        let taken = self.state.lock().await.take();
        if let Some(state) = taken {
            state.cancel.cancel();
            let mut writer = state.writer.lock().await;
            let _ = writer.shutdown().await;
        }
    }
}
