//! # Transport Layer
//!
//! Framed, typed connections over any async byte stream.
//!
//! The server and client both speak through [`connection::Connection`], which
//! wraps a TCP stream (or an in-memory duplex in tests) in the frame codec and
//! offers JSON and bincode helpers on top of raw frames.

pub mod connection;
