//! Codec trait and implementations for turning events into bytes.
//!
//! The engine never talks to a socket itself. A transport subscribes to
//! the hub, receives typed [`ServerEvent`](crate::ServerEvent)s, and uses
//! a [`Codec`] to produce whatever frame its clients expect.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented
    /// in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`. Behind the `json` feature.
///
/// ```rust
/// use arena_protocol::{Codec, JsonCodec, Phase, ServerEvent};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ServerEvent::Phase(Phase::Attack)).unwrap();
/// let back: ServerEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(back, ServerEvent::Phase(Phase::Attack));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
