//! # Serialization Formats
//!
//! The protocol carries two kinds of payload inside a frame:
//!
//! - **JSON** for control and status messages, so the handshake stays
//!   readable on the wire and easy to produce from any language.
//! - **Bincode** for result payloads, which carry typed records whose field
//!   names and types must survive the trip intact.
//!
//! ## Usage
//! ```
//! use object_exchange::core::serialization::{decode, encode, SerializationFormat};
//!
//! let bytes = encode(&vec![1u32, 2, 3], SerializationFormat::Bincode).unwrap();
//! let back: Vec<u32> = decode(&bytes, SerializationFormat::Bincode).unwrap();
//! assert_eq!(back, vec![1, 2, 3]);
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ProtocolError, Result};

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializationFormat {
    /// Human-readable JSON format (control messages)
    #[default]
    Json,
    /// Binary compact format (result payloads)
    Bincode,
}

impl SerializationFormat {
    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            SerializationFormat::Json => "JSON",
            SerializationFormat::Bincode => "Bincode",
        }
    }
}

/// Serialize `value` to bytes using the specified format
pub fn encode<T: Serialize + ?Sized>(value: &T, format: SerializationFormat) -> Result<Vec<u8>> {
    match format {
        SerializationFormat::Json => Ok(serde_json::to_vec(value)?),
        SerializationFormat::Bincode => Ok(bincode::serialize(value)?),
    }
}

/// Deserialize bytes using the specified format.
///
/// Failures of either format surface as [`ProtocolError::Decode`].
pub fn decode<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T> {
    match format {
        SerializationFormat::Json => serde_json::from_slice(data)
            .map_err(|e| ProtocolError::Decode(format!("{}: {e}", format.name()))),
        SerializationFormat::Bincode => bincode::deserialize(data)
            .map_err(|e| ProtocolError::Decode(format!("{}: {e}", format.name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::ControlMessage;

    #[test]
    fn test_format_names() {
        assert_eq!(SerializationFormat::Json.name(), "JSON");
        assert_eq!(SerializationFormat::Bincode.name(), "Bincode");
    }

    #[test]
    fn test_default_format() {
        assert_eq!(SerializationFormat::default(), SerializationFormat::Json);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_json_is_plain_text() {
        let bytes = encode(&ControlMessage::bye(), SerializationFormat::Json).expect("serialize");
        assert_eq!(bytes, br#"{"type":"BYE"}"#);
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let result: Result<ControlMessage> = decode(b"{not json", SerializationFormat::Json);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_garbage_bincode_is_decode_error() {
        let result: Result<String> = decode(&[0xFF; 3], SerializationFormat::Bincode);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
