//! # framelink
//!
//! Encrypted, length-prefixed message framing over TCP.
//!
//! The crate has two roles built on one shared core:
//! - [`Connector`]: client role, exactly one persistent outbound connection
//! - [`Server`]: listener role, many concurrent inbound connections keyed by
//!   remote-endpoint identity
//!
//! The core is the stream deframer ([`core::deframer`]): it turns an
//! arbitrary, fragmented sequence of byte deliveries into a reliable,
//! strictly ordered sequence of discrete, decrypted frames, with doubling
//! buffer growth and overlap-safe in-place compaction. It behaves identically
//! whether it drains one client connection or thousands of server connections.
//!
//! ## Wire Format
//! ```text
//! [Length(2, u16 LE, includes itself)] [Encrypted payload(L-2)]
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use framelink::config::{ConnectorConfig, ServerConfig};
//! use framelink::protocol::{DispatchReactor, Envelope, HandlerTable};
//! use framelink::transport::{Connector, LifecycleHooks, Server};
//! use framelink::utils::ChaChaFrameCipher;
//!
//! #[tokio::main]
//! async fn main() -> framelink::Result<()> {
//!     let cipher = Arc::new(ChaChaFrameCipher::new([7u8; 32]));
//!
//!     let server_reactor = Arc::new(DispatchReactor::new(cipher.clone()));
//!     let server = Server::new(ServerConfig::default(), server_reactor, cipher.clone());
//!
//!     let mut handlers = HandlerTable::new();
//!     handlers.insert(
//!         "echo".into(),
//!         Arc::new(|peer: &str, envelope: &framelink::Envelope| {
//!             println!("{peer} sent message {}", envelope.id);
//!         }),
//!     );
//!     let addr = server.start(9000, handlers, LifecycleHooks::new()).await?;
//!
//!     let client_reactor = Arc::new(DispatchReactor::new(cipher.clone()));
//!     let client = Connector::new(ConnectorConfig::default(), client_reactor, cipher);
//!     client
//!         .start("127.0.0.1", addr.port(), HandlerTable::new(), LifecycleHooks::new())
//!         .await?;
//!     client.send(1, Envelope::new("echo", b"hi".to_vec())).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::{ConnectorConfig, FramelinkConfig, ServerConfig};
pub use error::{FramingError, Result};
pub use protocol::{DispatchReactor, Envelope, HandlerTable, Reactor};
pub use transport::{Connector, LifecycleHooks, Server};
pub use utils::{ChaChaFrameCipher, FrameCipher, PlaintextCipher};
