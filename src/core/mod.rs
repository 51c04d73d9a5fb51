//! # Core Protocol Components
//!
//! Low-level frame handling, codecs, and payload serialization.
//!
//! This module provides the foundation for the protocol: framing over a byte
//! stream and turning frame payloads into typed values.
//!
//! ## Components
//! - **Frame**: length-prefixed unit of transmission
//! - **Codec**: Tokio codec for framing over byte streams
//! - **Serialization**: JSON for control messages, bincode for result payloads
//!
//! ## Wire Format
//! ```text
//! [Length(4, big-endian)] [Payload(Length)]
//! ```
//!
//! ## Safety Limits
//! - Declared lengths above the configured maximum (16MB by default) are
//!   rejected before any buffer is reserved

pub mod codec;
pub mod frame;
pub mod serialization;
