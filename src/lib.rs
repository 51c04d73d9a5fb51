//! # object-exchange
//!
//! Typed object collections served over TCP with a length-prefixed framing
//! protocol and a hard cap on concurrently connected clients.
//!
//! ## Layout
//! - [`core`]: frames, the Tokio codec and payload serialization
//! - [`transport`]: framed connections with JSON and bincode helpers
//! - [`protocol`]: messages, catalog, admission control, session state machine
//! - [`service`]: the server accept loop and the client session
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging, metrics
//!
//! ## Quick start
//! ```no_run
//! use object_exchange::config::ServerConfig;
//! use object_exchange::service::server::start_server;
//!
//! # async fn run() -> object_exchange::error::Result<()> {
//! start_server(&ServerConfig::default()).await
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use error::{ProtocolError, Result};
pub use protocol::catalog::{Catalog, CatalogRecord, Category};
pub use protocol::message::{ControlMessage, ResultPayload, StatusMessage};
pub use service::client::{ClientSession, Connect};
pub use service::server::Server;
