//! Players and items: the things that sit on tiles.

use std::fmt;
use std::str::FromStr;

use arena_protocol::{Coord, ItemId, PlayerId, Team};
use serde::{Deserialize, Serialize};

use crate::BoardError;

/// A character's archetype. Chosen at creation and shown to clients;
/// duels are decided by minigames, so resolution never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterClass {
    Fighter,
    Ranger,
    Rogue,
}

impl FromStr for CharacterClass {
    type Err = BoardError;

    /// Case-insensitive. "thief" is accepted as an alias for `Rogue`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIGHTER" => Ok(Self::Fighter),
            "RANGER" => Ok(Self::Ranger),
            "ROGUE" | "THIEF" => Ok(Self::Rogue),
            _ => Err(BoardError::UnknownClass(s.to_string())),
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fighter => "Fighter",
            Self::Ranger => "Ranger",
            Self::Rogue => "Rogue",
        };
        f.write_str(name)
    }
}

/// A character inside a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub class: CharacterClass,
    pub team: Team,
    /// Must always match exactly one tile's occupant list.
    pub position: Coord,
    /// At most one item.
    pub carried: Option<ItemId>,
}

/// A pickable item. Either rests on a tile or is carried, in which case
/// its position is [`Coord::OFF_BOARD`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub position: Coord,
}

impl Item {
    pub fn is_carried(&self) -> bool {
        self.position.is_off_board()
    }
}
