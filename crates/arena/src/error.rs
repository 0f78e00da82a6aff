//! Unified error type for the arena engine.

use arena_board::BoardError;
use arena_protocol::{ErrorKind, ProtocolError};
use arena_sync::SyncError;
use arena_turn::{HubError, TurnError};

/// Top-level error that wraps every crate-specific error.
///
/// Transports usually only care about [`kind`](Self::kind).
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Room, player, or tile problem.
    #[error(transparent)]
    Board(#[from] BoardError),

    /// Buffer, gate, or duel problem.
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error(transparent)]
    Hub(#[from] HubError),
}

impl ArenaError {
    /// The transport-facing classification of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol(err) => err.kind(),
            Self::Board(err) => err.kind(),
            Self::Sync(err) => err.kind(),
            Self::Turn(err) => err.kind(),
            Self::Hub(err) => err.kind(),
        }
    }
}
