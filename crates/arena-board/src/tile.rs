//! A single board square and what sits on it.

use arena_protocol::{Coord, ItemId, PlayerId, Team};
use serde::{Deserialize, Serialize};

/// What kind of square a tile is.
///
/// Spawn and treasure tiles belong to a team and are excluded from
/// collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileFlag {
    Empty,
    Spawn,
    Treasure,
}

/// One square of the grid.
///
/// Occupants and items keep insertion order, which is the "fixed order"
/// the turn processor scans in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub coord: Coord,
    pub flag: TileFlag,
    /// Owning team for spawn / treasure tiles.
    pub team: Option<Team>,
    occupants: Vec<PlayerId>,
    items: Vec<ItemId>,
}

impl Tile {
    /// A plain, empty tile.
    pub fn new(coord: Coord) -> Self {
        Self {
            coord,
            flag: TileFlag::Empty,
            team: None,
            occupants: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Players standing here, in arrival order.
    pub fn occupants(&self) -> &[PlayerId] {
        &self.occupants
    }

    /// Items resting here, oldest first.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn add_player(&mut self, id: PlayerId) {
        if !self.occupants.contains(&id) {
            self.occupants.push(id);
        }
    }

    /// Returns `true` if the player was listed here.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let before = self.occupants.len();
        self.occupants.retain(|p| *p != id);
        self.occupants.len() != before
    }

    pub fn add_item(&mut self, id: ItemId) {
        if !self.items.contains(&id) {
            self.items.push(id);
        }
    }

    /// Returns `true` if the item was resting here.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| *i != id);
        self.items.len() != before
    }

    /// Empties the tile's item list, returning what was on it.
    pub fn take_items(&mut self) -> Vec<ItemId> {
        std::mem::take(&mut self.items)
    }

    /// Spawn or treasure tile.
    pub fn is_special(&self) -> bool {
        self.flag != TileFlag::Empty
    }

    /// At least one occupant or item.
    pub fn is_not_empty(&self) -> bool {
        !self.occupants.is_empty() || !self.items.is_empty()
    }

    /// A plain tile with nothing on it.
    pub fn is_free(&self) -> bool {
        !self.is_special() && !self.is_not_empty()
    }
}
