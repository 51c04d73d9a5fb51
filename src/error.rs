//! # Error Types
//!
//! Error handling for the object exchange protocol.
//!
//! Every failure a session can hit is a variant of [`ProtocolError`]. Errors are
//! session-local: the server drops the affected connection and keeps serving
//! everyone else.
//!
//! ## Error Categories
//! - **I/O Errors**: socket and file system failures
//! - **Protocol Errors**: closed or truncated frames, oversized frames, unexpected messages
//! - **Decode Errors**: payloads that are not valid JSON or bincode for the expected shape
//! - **Validation Errors**: records whose category does not match the requested class
//! - **Configuration Errors**: unreadable or invalid configuration
//!
//! Admission refusal is deliberately absent: a full server answering `REFUSED`
//! is a normal protocol outcome, not a failure.
//!
//! ## Example Usage
//! ```rust
//! use object_exchange::error::{ProtocolError, Result};
//! use std::fs::File;
//! use std::io::Read;
//! use tracing::{info, error};
//!
//! fn read_file(path: &str) -> Result<String> {
//!     let mut file = File::open(path).map_err(ProtocolError::Io)?;
//!     let mut contents = String::new();
//!     file.read_to_string(&mut contents).map_err(ProtocolError::Io)?;
//!     Ok(contents)
//! }
//!
//! fn main() {
//!     match read_file("example.txt") {
//!         Ok(contents) => info!(contents, "Successfully read file"),
//!         Err(e) => error!(error=%e, "Error reading file"),
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants shared by the codec and the session handler.
pub mod constants {
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_TRUNCATED_FRAME: &str = "Connection closed in the middle of a frame";
    pub const ERR_LOCK_POISONED: &str = "Synchronization primitive poisoned";
    pub const ERR_EXPECTED_HELLO: &str = "Expected a hello carrying an integer client_id";
    pub const ERR_EXPECTED_COLLECTION: &str = "Expected a collection, received a single record";
}

// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Truncated frame: {0}")]
    TruncatedFrame(String),

    #[error("Frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("Invalid hello: {0}")]
    InvalidHello(String),

    #[error("Unexpected message type")]
    UnexpectedMessage,

    #[error("Connection timed out (no activity)")]
    ConnectionTimeout,

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Decode(err.to_string())
    }
}

impl ProtocolError {
    /// True for failures that come from the peer violating the framing or
    /// message protocol rather than from the socket itself.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ProtocolError::TruncatedFrame(_)
                | ProtocolError::OversizedFrame(_)
                | ProtocolError::InvalidHello(_)
                | ProtocolError::UnexpectedMessage
                | ProtocolError::Decode(_)
                | ProtocolError::Serialization(_)
        )
    }

    /// True when the failure concerns one payload only and the connection is
    /// still in sync, so a client may keep using its session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProtocolError::Decode(_)
                | ProtocolError::Serialization(_)
                | ProtocolError::TypeMismatch(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
