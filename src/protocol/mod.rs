//! # Protocol Layer
//!
//! Messages, the object catalog, admission control and the per-connection
//! session state machine.
//!
//! ## Components
//! - **Message**: JSON control/status messages and the bincode result payload
//! - **Catalog**: immutable record store answering prefix queries
//! - **Admission**: mutex-guarded cap on concurrently admitted clients
//! - **Session**: hello, admit or refuse, then query/answer until BYE
//!
//! ## Session Flow
//! 1. Client sends `{"client_id": n}`
//! 2. Server answers `OK` (slot reserved) or `REFUSED` (server full, connection closed)
//! 3. Client sends `GET` queries, each answered with one bincode frame
//! 4. Client sends `BYE`; the server releases the slot and closes

pub mod admission;
pub mod catalog;
pub mod message;
pub mod session;
