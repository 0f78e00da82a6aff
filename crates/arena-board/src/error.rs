//! Error types for the board layer.

use arena_protocol::{Coord, ErrorKind, ItemId, PlayerId, RoomId};

/// Errors that can occur while reading or mutating a room's board.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The coordinate is outside the grid.
    #[error("coordinate {0} is out of bounds")]
    OutOfBounds(Coord),

    /// The room does not exist.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The player is not part of this room.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// The item is not part of this room.
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// Every candidate tile is taken; an item has nowhere to go.
    #[error("no empty tile available for item placement")]
    NoEmptyTile,

    /// The requested board is too small to hold both teams' corners.
    #[error("invalid board dimensions {width}x{height} (minimum {min}x{min})")]
    InvalidDimensions { width: i32, height: i32, min: i32 },

    /// The character class name is not one we know.
    #[error("unknown character class: {0}")]
    UnknownClass(String),
}

impl BoardError {
    /// Maps the error onto the workspace-wide taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_) | Self::PlayerNotFound(_) | Self::ItemNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::NoEmptyTile => ErrorKind::ResourceExhausted,
            Self::OutOfBounds(_) | Self::InvalidDimensions { .. } | Self::UnknownClass(_) => {
                ErrorKind::InvalidState
            }
        }
    }
}
