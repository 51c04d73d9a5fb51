//! Protocol messages.
//!
//! Control traffic (hello, query, bye) and status replies are JSON objects;
//! query results are bincode-encoded [`ResultPayload`]s.
//!
//! ```text
//! client -> server   {"client_id": 7}
//! server -> client   {"status": "OK"} | {"status": "REFUSED"}
//! client -> server   {"type": "GET", "class": "cat"}
//! server -> client   <bincode ResultPayload>
//! client -> server   {"type": "BYE"}
//! ```

use serde::{Deserialize, Serialize};

use crate::protocol::catalog::CatalogRecord;

/// Client-to-server control message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireControl", into = "WireControl")]
pub enum ControlMessage {
    /// First message of every session
    Hello { client_id: i64 },
    /// Request for every record whose key starts with `class_name`
    Query { class_name: String },
    /// Ends the session; the server sends nothing back
    Bye,
}

impl ControlMessage {
    pub fn hello(client_id: i64) -> Self {
        ControlMessage::Hello { client_id }
    }

    pub fn query(class_name: impl Into<String>) -> Self {
        ControlMessage::Query {
            class_name: class_name.into(),
        }
    }

    pub fn bye() -> Self {
        ControlMessage::Bye
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::Hello { .. } => "HELLO",
            ControlMessage::Query { .. } => "GET",
            ControlMessage::Bye => "BYE",
        }
    }
}

// Hello has no "type" field on the wire, every other message does.
// Untagged variants are tried in order, so a tagged command wins over a
// stray `client_id` carried alongside it.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireControl {
    Command(WireCommand),
    Hello { client_id: i64 },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum WireCommand {
    #[serde(rename = "GET")]
    Get { class: String },
    #[serde(rename = "BYE")]
    Bye,
}

impl From<WireControl> for ControlMessage {
    fn from(wire: WireControl) -> Self {
        match wire {
            WireControl::Hello { client_id } => ControlMessage::Hello { client_id },
            WireControl::Command(WireCommand::Get { class }) => {
                ControlMessage::Query { class_name: class }
            }
            WireControl::Command(WireCommand::Bye) => ControlMessage::Bye,
        }
    }
}

impl From<ControlMessage> for WireControl {
    fn from(msg: ControlMessage) -> Self {
        match msg {
            ControlMessage::Hello { client_id } => WireControl::Hello { client_id },
            ControlMessage::Query { class_name } => {
                WireControl::Command(WireCommand::Get { class: class_name })
            }
            ControlMessage::Bye => WireControl::Command(WireCommand::Bye),
        }
    }
}

/// Admission decision sent in reply to a hello
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Refused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: Status,
}

impl StatusMessage {
    pub fn ok() -> Self {
        Self { status: Status::Ok }
    }

    pub fn refused() -> Self {
        Self {
            status: Status::Refused,
        }
    }
}

/// Answer to a query.
///
/// A query that matches nothing is answered with one random record instead of
/// an empty collection, so the two shapes are distinct variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultPayload {
    Single(CatalogRecord),
    Collection(Vec<CatalogRecord>),
}

impl ResultPayload {
    /// Borrow the carried records regardless of shape
    pub fn records(&self) -> &[CatalogRecord] {
        match self {
            ResultPayload::Single(record) => std::slice::from_ref(record),
            ResultPayload::Collection(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, ResultPayload::Collection(_))
    }
}
