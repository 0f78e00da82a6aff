//! Rooms and the room registry.
//!
//! A [`Room`] owns one grid plus the players and items on it. Every
//! mutation that touches both a player's own record and a tile's lists
//! goes through a `Room` method so the two never drift apart.
//!
//! Rooms are shared as `Arc<Mutex<Room>>`: one exclusion scope per room,
//! so cycles in different rooms never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arena_protocol::{Coord, ItemId, PlayerId, RoomId, Team};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::{BoardError, CharacterClass, Grid, Item, Player};

static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// A room behind its lock.
pub type SharedRoom = Arc<Mutex<Room>>;

/// Where an item went during a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemMove {
    pub item_id: ItemId,
    pub from: Coord,
    pub to: Coord,
}

/// One match: the board plus every player and item on it.
///
/// All mutations go through methods that update the tile lists and the
/// player or item records together.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    grid: Grid,
    players: HashMap<PlayerId, Player>,
    items: HashMap<ItemId, Item>,
}

impl Room {
    /// Wraps a grid in a fresh room with a new id.
    pub fn new(grid: Grid) -> Self {
        Self {
            id: RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed)),
            grid,
            players: HashMap::new(),
            items: HashMap::new(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// # Errors
    /// [`BoardError::PlayerNotFound`] if the player is not in this room.
    pub fn player(&self, id: PlayerId) -> Result<&Player, BoardError> {
        self.players.get(&id).ok_or(BoardError::PlayerNotFound(id))
    }

    pub fn item(&self, id: ItemId) -> Result<&Item, BoardError> {
        self.items.get(&id).ok_or(BoardError::ItemNotFound(id))
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Creates a character on its team's spawn tile.
    pub fn add_character(
        &mut self,
        name: impl Into<String>,
        class: CharacterClass,
        team: Team,
    ) -> Result<PlayerId, BoardError> {
        let id = PlayerId(NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed));
        let spawn = self.grid.spawn(team);
        self.grid.add_player(spawn, id)?;
        self.players.insert(
            id,
            Player {
                id,
                name: name.into(),
                class,
                team,
                position: spawn,
                carried: None,
            },
        );
        Ok(id)
    }

    /// Creates an item resting on `at`.
    pub fn place_item(
        &mut self,
        name: impl Into<String>,
        at: Coord,
    ) -> Result<ItemId, BoardError> {
        let id = ItemId(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed));
        self.grid.add_item(at, id)?;
        self.items.insert(
            id,
            Item {
                id,
                name: name.into(),
                position: at,
            },
        );
        Ok(id)
    }

    /// Creates one item per name on uniformly random plain tiles.
    pub fn scatter_items<S, R>(
        &mut self,
        names: impl IntoIterator<Item = S>,
        rng: &mut R,
    ) -> Result<Vec<ItemId>, BoardError>
    where
        S: Into<String>,
        R: Rng + ?Sized,
    {
        let plain = self.grid.plain_tiles();
        let mut placed = Vec::new();
        for name in names {
            let &at = plain.choose(rng).ok_or(BoardError::NoEmptyTile)?;
            placed.push(self.place_item(name, at)?);
        }
        Ok(placed)
    }

    /// Moves a player to `to`, updating the player record and both tiles
    /// together. Returns the position the player left.
    ///
    /// # Errors
    /// [`BoardError::OutOfBounds`] if `to` is off the board; nothing is
    /// changed in that case.
    pub fn relocate_player(
        &mut self,
        id: PlayerId,
        to: Coord,
    ) -> Result<Coord, BoardError> {
        let from = self.player(id)?.position;
        // Bounds check before touching either side.
        self.grid.tile(to)?;

        if from != to {
            self.grid.remove_player(from, id)?;
            self.grid.add_player(to, id)?;
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.position = to;
        }
        Ok(from)
    }

    /// Drops whatever the player carries onto the tile they stand on.
    pub fn drop_carried(&mut self, id: PlayerId) -> Result<Option<ItemMove>, BoardError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(BoardError::PlayerNotFound(id))?;
        let Some(item_id) = player.carried.take() else {
            return Ok(None);
        };
        let at = player.position;

        let item = self
            .items
            .get_mut(&item_id)
            .ok_or(BoardError::ItemNotFound(item_id))?;
        let from = item.position;
        item.position = at;
        self.grid.add_item(at, item_id)?;

        Ok(Some(ItemMove { item_id, from, to: at }))
    }

    /// Gives the player the oldest item on their tile, if they have a free
    /// hand and there is anything to take.
    pub fn pick_up(&mut self, id: PlayerId) -> Result<Option<ItemMove>, BoardError> {
        let player = self.player(id)?;
        if player.carried.is_some() {
            return Ok(None);
        }
        let at = player.position;
        let Some(&item_id) = self.grid.tile(at)?.items().first() else {
            return Ok(None);
        };
        self.grid.remove_item(at, item_id)?;

        let item = self
            .items
            .get_mut(&item_id)
            .ok_or(BoardError::ItemNotFound(item_id))?;
        item.position = Coord::OFF_BOARD;
        if let Some(player) = self.players.get_mut(&id) {
            player.carried = Some(item_id);
        }

        Ok(Some(ItemMove {
            item_id,
            from: at,
            to: Coord::OFF_BOARD,
        }))
    }

    /// Scatters `team`'s treasure and keeps the item records in step.
    pub fn disperse_treasure<R: Rng + ?Sized>(
        &mut self,
        team: Team,
        rng: &mut R,
    ) -> Result<Vec<ItemMove>, BoardError> {
        let from = self.grid.treasure_location(team);
        let moved = self.grid.disperse_items(team, rng)?;
        let mut moves = Vec::with_capacity(moved.len());
        for (item_id, to) in moved {
            if let Some(item) = self.items.get_mut(&item_id) {
                item.position = to;
            }
            moves.push(ItemMove { item_id, from, to });
        }
        Ok(moves)
    }

    /// A serializable copy of the board, players, and items.
    pub fn snapshot(&self) -> RoomSnapshot {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by_key(|p| p.id);
        let mut items: Vec<Item> = self.items.values().cloned().collect();
        items.sort_by_key(|i| i.id);
        RoomSnapshot {
            room_id: self.id,
            width: self.grid.width(),
            height: self.grid.height(),
            players,
            items,
        }
    }
}

/// Serializable view of a room, sent to clients that join mid-game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub width: i32,
    pub height: i32,
    pub players: Vec<Player>,
    pub items: Vec<Item>,
}

// ---------------------------------------------------------------------------
// RoomRegistry
// ---------------------------------------------------------------------------

/// All live rooms, keyed by id.
///
/// The outer lock is only held long enough to look a room up; work on a
/// room happens under that room's own mutex.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, SharedRoom>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a `width`×`height` room with the named items scattered over
    /// plain tiles and registers it.
    pub async fn create_room<S: Into<String>>(
        &self,
        width: i32,
        height: i32,
        item_names: impl IntoIterator<Item = S>,
    ) -> Result<RoomId, BoardError> {
        let mut room = Room::new(Grid::new(width, height)?);
        room.scatter_items(item_names, &mut rand::rng())?;
        let room_id = room.id();
        self.insert(room).await;
        tracing::info!(%room_id, width, height, "room created");
        Ok(room_id)
    }

    /// Registers an already-built room.
    pub async fn insert(&self, room: Room) -> SharedRoom {
        let room_id = room.id();
        let shared = Arc::new(Mutex::new(room));
        self.rooms.write().await.insert(room_id, Arc::clone(&shared));
        shared
    }

    /// Looks up a room handle.
    ///
    /// # Errors
    /// [`BoardError::RoomNotFound`] if no room has that id.
    pub async fn get(&self, room_id: RoomId) -> Result<SharedRoom, BoardError> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .cloned()
            .ok_or(BoardError::RoomNotFound(room_id))
    }

    /// Adds a character to a room, placing it on its team's spawn.
    pub async fn create_character(
        &self,
        room_id: RoomId,
        name: &str,
        class: &str,
        team: Team,
    ) -> Result<PlayerId, BoardError> {
        let class: CharacterClass = class.parse()?;
        let room = self.get(room_id).await?;
        let player_id = room.lock().await.add_character(name, class, team)?;
        tracing::info!(%room_id, %player_id, %class, %team, "character created");
        Ok(player_id)
    }
}
