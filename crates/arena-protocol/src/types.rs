//! Core identity and payload types for the arena wire format.
//!
//! Everything in here travels between the transport layer and the
//! engine: identifiers, board coordinates, and the four kinds of
//! submissions a player can make during an open action window.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player (a character inside one room).
///
/// Newtype wrapper so a `PlayerId` can never be passed where an
/// `ItemId` or `DuelId` is expected. `#[serde(transparent)]` keeps the
/// JSON representation a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a room (one running match).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// A unique identifier for an item on the board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I-{}", self.0)
    }
}

/// Identifier of an ephemeral duel. Unique within its room only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DuelId(pub u64);

impl fmt::Display for DuelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// One of the two sides in a match.
///
/// On the wire a team is its number: `0` for [`Team::First`], `1` for
/// [`Team::Second`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Team {
    First,
    Second,
}

impl Team {
    /// Both teams, in index order.
    pub const ALL: [Team; 2] = [Team::First, Team::Second];

    /// The other side.
    pub fn opponent(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Index into per-team arrays (`0` or `1`).
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

impl From<Team> for u8 {
    fn from(team: Team) -> u8 {
        team.index() as u8
    }
}

impl TryFrom<u8> for Team {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::First),
            1 => Ok(Self::Second),
            other => Err(ProtocolError::InvalidMessage(format!(
                "team must be 0 or 1, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.index())
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A tile coordinate. Signed so that client-supplied garbage and the
/// off-board sentinel are representable; the grid does the bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    /// Position recorded for an item while it sits in a player's bag.
    pub const OFF_BOARD: Coord = Coord { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `true` for [`Coord::OFF_BOARD`], the position of a carried item.
    pub fn is_off_board(self) -> bool {
        self == Self::OFF_BOARD
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

/// Who an attack is aimed at: another player, or the attacker's team
/// treasure stash.
///
/// JSON: `"treasure"` or `{ "player": 7 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackTarget {
    Treasure,
    Player(PlayerId),
}

/// Client → Server: "I attack this target."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackPayload {
    pub attacker_id: PlayerId,
    pub defender: AttackTarget,
}

/// Client → Server: "I move from `prev` to `(x, y)`."
///
/// The previous position is advisory. The engine moves the player from
/// wherever the board says they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePayload {
    pub x: i32,
    pub y: i32,
    pub prev_x: i32,
    pub prev_y: i32,
    pub player_id: PlayerId,
}

impl MovePayload {
    pub fn target(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    pub fn previous(&self) -> Coord {
        Coord::new(self.prev_x, self.prev_y)
    }
}

/// Client → Server: "After moving, I strike at whoever is on `(x, y)`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusAttackPayload {
    pub x: i32,
    pub y: i32,
    pub attacker_id: PlayerId,
}

impl BonusAttackPayload {
    pub fn target(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// Client → Server: "I do nothing this cycle." Has no board effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipPayload {
    pub player_id: PlayerId,
}
