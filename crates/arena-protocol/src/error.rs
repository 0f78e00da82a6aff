//! Error types for the protocol layer, plus the error taxonomy shared by
//! every crate in the workspace.

use std::fmt;

/// The four kinds of failure the engine distinguishes.
///
/// Every crate-specific error enum maps onto one of these through a
/// `kind()` method, so callers at the edge (transport, logging) can
/// react without matching on each crate's variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A room, player, duel, or tile does not exist.
    NotFound,
    /// The operation is not valid right now (barrier already open,
    /// coordinates off the board, ...).
    InvalidState,
    /// No free tile is left to place an item on.
    ResourceExhausted,
    /// A collaborator failed and the in-progress step was abandoned.
    Aborted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::InvalidState => "invalid state",
            Self::ResourceExhausted => "resource exhausted",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates a protocol rule (e.g. team 7).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidState
    }
}
