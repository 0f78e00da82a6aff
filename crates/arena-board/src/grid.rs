//! The tile-addressable board.
//!
//! Corner layout, inset by one tile from the edge:
//!
//! ```text
//!  (1,1)            (w-2,1)
//!  treasure[First]  spawn[First]
//!
//!  (1,h-2)          (w-2,h-2)
//!  spawn[Second]    treasure[Second]
//! ```
//!
//! The grid only maintains its tiles' occupant and item lists. Keeping a
//! player's own coordinates in step is the caller's job (see
//! [`Room::relocate_player`](crate::Room::relocate_player)).

use arena_protocol::{Coord, ItemId, PlayerId, Team};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::{BoardError, Tile, TileFlag};

/// Smallest board on which the four corner tiles are distinct.
pub const MIN_SIDE: i32 = 4;

/// A rectangular board of [`Tile`]s with one spawn and one treasure
/// corner per team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    /// Column-major: index = x * height + y.
    tiles: Vec<Tile>,
}

impl Grid {
    /// Builds an empty board with the team corners flagged.
    ///
    /// # Errors
    /// [`BoardError::InvalidDimensions`] if either side is below
    /// [`MIN_SIDE`], or if the tile count does not fit in an `i32`.
    pub fn new(width: i32, height: i32) -> Result<Self, BoardError> {
        let invalid = BoardError::InvalidDimensions {
            width,
            height,
            min: MIN_SIDE,
        };
        if width < MIN_SIDE || height < MIN_SIDE {
            return Err(invalid);
        }
        // Tile indices are computed in i32, so the whole area must fit.
        let Some(area) = width.checked_mul(height) else {
            return Err(invalid);
        };

        let mut tiles = Vec::with_capacity(area as usize);
        for x in 0..width {
            for y in 0..height {
                tiles.push(Tile::new(Coord::new(x, y)));
            }
        }

        let mut grid = Self { width, height, tiles };
        for team in Team::ALL {
            let treasure = grid.treasure_location(team);
            let spawn = grid.spawn(team);
            grid.flag(treasure, TileFlag::Treasure, team)?;
            grid.flag(spawn, TileFlag::Spawn, team)?;
        }
        Ok(grid)
    }

    fn flag(&mut self, at: Coord, flag: TileFlag, team: Team) -> Result<(), BoardError> {
        let tile = self.tile_mut(at)?;
        tile.flag = flag;
        tile.team = Some(team);
        Ok(())
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn index(&self, at: Coord) -> Result<usize, BoardError> {
        if at.x < 0 || at.x >= self.width || at.y < 0 || at.y >= self.height {
            return Err(BoardError::OutOfBounds(at));
        }
        Ok((at.x * self.height + at.y) as usize)
    }

    /// # Errors
    /// [`BoardError::OutOfBounds`] if `at` is not on the board.
    pub fn tile(&self, at: Coord) -> Result<&Tile, BoardError> {
        let idx = self.index(at)?;
        Ok(&self.tiles[idx])
    }

    /// # Errors
    /// [`BoardError::OutOfBounds`] if `at` is not on the board.
    pub fn tile_mut(&mut self, at: Coord) -> Result<&mut Tile, BoardError> {
        let idx = self.index(at)?;
        Ok(&mut self.tiles[idx])
    }

    /// Lists `item` on the tile at `at`.
    pub fn add_item(&mut self, at: Coord, item: ItemId) -> Result<(), BoardError> {
        self.tile_mut(at)?.add_item(item);
        Ok(())
    }

    /// Unlists `item` from the tile at `at`. Returns `true` if it was
    /// there.
    pub fn remove_item(&mut self, at: Coord, item: ItemId) -> Result<bool, BoardError> {
        Ok(self.tile_mut(at)?.remove_item(item))
    }

    /// Lists `player` as an occupant of the tile at `at`.
    pub fn add_player(&mut self, at: Coord, player: PlayerId) -> Result<(), BoardError> {
        self.tile_mut(at)?.add_player(player);
        Ok(())
    }

    /// Unlists `player` from the tile at `at`. Returns `true` if it was
    /// there.
    pub fn remove_player(&mut self, at: Coord, player: PlayerId) -> Result<bool, BoardError> {
        Ok(self.tile_mut(at)?.remove_player(player))
    }

    /// Tiles with at least one occupant or item, in column-major order.
    pub fn non_empty_tiles(&self) -> Vec<Coord> {
        self.tiles
            .iter()
            .filter(|t| t.is_not_empty())
            .map(|t| t.coord)
            .collect()
    }

    /// Plain tiles with nothing on them.
    pub fn free_tiles(&self) -> Vec<Coord> {
        self.tiles
            .iter()
            .filter(|t| t.is_free())
            .map(|t| t.coord)
            .collect()
    }

    /// Plain (non-special) tiles, occupied or not.
    pub fn plain_tiles(&self) -> Vec<Coord> {
        self.tiles
            .iter()
            .filter(|t| !t.is_special())
            .map(|t| t.coord)
            .collect()
    }

    /// The team's spawn tile, where its characters start and respawn.
    pub fn spawn(&self, team: Team) -> Coord {
        match team {
            Team::First => Coord::new(self.width - 2, 1),
            Team::Second => Coord::new(1, self.height - 2),
        }
    }

    /// The team's treasure tile.
    pub fn treasure_location(&self, team: Team) -> Coord {
        match team {
            Team::First => Coord::new(1, 1),
            Team::Second => Coord::new(self.width - 2, self.height - 2),
        }
    }

    /// Empties `team`'s treasure tile, dropping each item on a uniformly
    /// random tile that was free before the dispersal started.
    ///
    /// Returns where every item went.
    ///
    /// # Errors
    /// [`BoardError::NoEmptyTile`] if items remain but no tile is free.
    /// The treasure tile is left untouched in that case.
    pub fn disperse_items<R: Rng + ?Sized>(
        &mut self,
        team: Team,
        rng: &mut R,
    ) -> Result<Vec<(ItemId, Coord)>, BoardError> {
        let chest = self.treasure_location(team);
        if self.tile(chest)?.items().is_empty() {
            return Ok(Vec::new());
        }

        let free = self.free_tiles();
        if free.is_empty() {
            return Err(BoardError::NoEmptyTile);
        }

        let items = self.tile_mut(chest)?.take_items();
        let mut moved = Vec::with_capacity(items.len());
        for item in items {
            let Some(&to) = free.choose(rng) else {
                return Err(BoardError::NoEmptyTile);
            };
            self.add_item(to, item)?;
            moved.push((item, to));
        }
        Ok(moved)
    }
}
