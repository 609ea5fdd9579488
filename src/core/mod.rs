//! # Core Framing Components
//!
//! Low-level frame extraction and per-connection state.
//!
//! This module is the heart of the crate: it turns an arbitrary, fragmented
//! sequence of byte deliveries into a reliable sequence of discrete,
//! decrypted frames, identically for one client connection or thousands of
//! server connections.
//!
//! ## Components
//! - **Frame**: wire-format constants and header helpers
//! - **Deframer**: incremental frame extraction with in-place compaction
//! - **Connection**: the per-stream record the deframer operates on
//!
//! ## Wire Format
//! ```text
//! [Length(2, u16 LE, includes itself)] [Encrypted payload(L-2)]
//! ```

pub mod connection;
pub mod deframer;
pub mod frame;
