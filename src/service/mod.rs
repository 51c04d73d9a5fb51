//! # Services
//!
//! The two ends of the protocol: the TCP server loop and the client session.

pub mod client;
pub mod server;
