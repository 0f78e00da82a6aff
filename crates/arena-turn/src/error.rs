use arena_board::BoardError;
use arena_protocol::ErrorKind;
use arena_sync::SyncError;

use crate::HubError;

/// Anything that aborts a resolution cycle.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A unicast failed while a duel was being set up.
    #[error("duel setup aborted: {0}")]
    Hub(#[from] HubError),

    #[error("minigame catalog is empty")]
    NoMinigames,
}

impl TurnError {
    /// Delegates to the wrapped layer's classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Board(err) => err.kind(),
            Self::Sync(err) => err.kind(),
            Self::Hub(err) => err.kind(),
            Self::NoMinigames => ErrorKind::InvalidState,
        }
    }
}
