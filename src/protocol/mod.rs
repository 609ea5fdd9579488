//! # Protocol Components
//!
//! The application-facing boundary above the framing core.
//!
//! ## Components
//! - **Message**: the [`Envelope`](message::Envelope) carried inside frames
//! - **Reactor**: the dispatch/serialization boundary the transports consume

pub mod message;
pub mod reactor;

pub use message::Envelope;
pub use reactor::{DispatchReactor, Handler, HandlerTable, Reactor};
