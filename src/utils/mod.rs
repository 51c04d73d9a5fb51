//! # Utility Modules
//!
//! Supporting utilities shared by the server, the client and the binaries.
//!
//! ## Components
//! - **Client ID**: file-backed counter giving each client run a fresh identifier
//! - **Logging**: structured logging setup
//! - **Metrics**: per-server session counters
//! - **Timeout**: async timeout wrappers

pub mod client_id;
pub mod logging;
pub mod metrics;
pub mod timeout;
