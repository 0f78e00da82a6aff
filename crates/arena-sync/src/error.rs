//! Error types for the coordination layer.

use arena_protocol::{DuelId, ErrorKind, PlayerId, RoomId};

/// Errors raised by the action buffer, gate, and arbiter.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The room was never started / initialized in this registry.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// No duel with this id exists in the room.
    #[error("duel {0} not found")]
    DuelNotFound(DuelId),

    /// The player has no open barrier (e.g. a second close).
    #[error("no open barrier for player {0}")]
    BarrierNotFound(PlayerId),

    /// The player already has an open barrier.
    #[error("barrier already open for player {0}")]
    AlreadyOpen(PlayerId),

    /// A player can't be paired with themselves.
    #[error("player {0} cannot duel themselves")]
    SelfDuel(PlayerId),

    /// The submitter or claimed winner is not one of the two duelists.
    #[error("player {player} is not part of duel {duel}")]
    NotADuelist { duel: DuelId, player: PlayerId },
}

impl SyncError {
    /// Maps the error onto the workspace-wide taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_) | Self::DuelNotFound(_) | Self::BarrierNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::AlreadyOpen(_) | Self::SelfDuel(_) | Self::NotADuelist { .. } => {
                ErrorKind::InvalidState
            }
        }
    }
}
