//! Client side of the protocol.
//!
//! A client introduces itself with its identifier, then either gets a
//! [`ClientSession`] or is told the server is full. Results are checked
//! against the requested category before they reach the caller; a mismatch is
//! an error for that request only and the session stays usable.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

use crate::error::{constants, ProtocolError, Result};
use crate::protocol::catalog::{CatalogRecord, Category};
use crate::protocol::message::{ControlMessage, ResultPayload, Status, StatusMessage};
use crate::transport::connection::Connection;

/// Result of introducing ourselves to a server
pub enum Connect<S = TcpStream> {
    Admitted(ClientSession<S>),
    Refused,
}

/// Open a TCP connection to `address` and say hello
#[instrument]
pub async fn connect(address: &str, client_id: i64) -> Result<Connect> {
    let stream = TcpStream::connect(address).await?;
    ClientSession::handshake(stream, client_id).await
}

pub struct ClientSession<S = TcpStream> {
    conn: Connection<S>,
    client_id: i64,
}

impl<S> ClientSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Send the hello over an established stream and interpret the status
    pub async fn handshake(stream: S, client_id: i64) -> Result<Connect<S>> {
        let mut conn = Connection::new(stream);
        conn.write_json(&ControlMessage::hello(client_id)).await?;
        let reply: StatusMessage = conn.read_json().await?;

        match reply.status {
            Status::Ok => {
                info!(client_id, "Connected");
                Ok(Connect::Admitted(Self { conn, client_id }))
            }
            Status::Refused => {
                info!(client_id, "Connection refused");
                if let Err(e) = conn.close().await {
                    debug!(error = %e, "Error while closing refused connection");
                }
                Ok(Connect::Refused)
            }
        }
    }

    pub fn client_id(&self) -> i64 {
        self.client_id
    }

    /// Ask for `class_name` and return whatever the server sent
    pub async fn request_raw(&mut self, class_name: &str) -> Result<ResultPayload> {
        self.conn
            .write_json(&ControlMessage::query(class_name))
            .await?;
        self.conn.read_bincode().await
    }

    /// Ask for every record of `category`.
    ///
    /// Fails with [`ProtocolError::TypeMismatch`] if the answer is not a
    /// collection of `category` records.
    pub async fn request(&mut self, category: Category) -> Result<Vec<CatalogRecord>> {
        let payload = self.request_raw(category.as_str()).await?;
        validate_payload(category, payload)
    }

    /// Say goodbye and close the connection
    pub async fn bye(mut self) -> Result<()> {
        self.conn.write_json(&ControlMessage::bye()).await?;
        self.conn.close().await?;
        info!(client_id = self.client_id, "Disconnected");
        Ok(())
    }
}

/// Check that `payload` is a collection holding only `expected` records
pub fn validate_payload(expected: Category, payload: ResultPayload) -> Result<Vec<CatalogRecord>> {
    match payload {
        ResultPayload::Single(record) => Err(ProtocolError::TypeMismatch(format!(
            "{} ({})",
            constants::ERR_EXPECTED_COLLECTION,
            record.category.type_name()
        ))),
        ResultPayload::Collection(records) => {
            if let Some(stray) = records.iter().find(|r| r.category != expected) {
                return Err(ProtocolError::TypeMismatch(format!(
                    "Cannot cast {} to {}",
                    stray.category.type_name(),
                    expected.type_name()
                )));
            }
            Ok(records)
        }
    }
}
