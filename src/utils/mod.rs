//! # Utility Modules
//!
//! Supporting utilities consumed by the framing core.
//!
//! ## Components
//! - **Crypto**: the in-place frame cipher boundary (ChaCha20)
//! - **Logging**: structured logging configuration

pub mod crypto;
pub mod logging;

pub use crypto::{ChaChaFrameCipher, FrameCipher, PlaintextCipher};
