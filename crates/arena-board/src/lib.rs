//! The board: grid, tiles, rooms, and the pieces on them.
//!
//! # Key types
//!
//! - [`Grid`]: bounds-checked tile storage with fixed team corners
//! - [`Room`]: a grid plus its players and items, mutated as one unit
//! - [`RoomRegistry`]: creates rooms and characters, hands out
//!   [`SharedRoom`] handles

mod error;
mod grid;
mod piece;
mod room;
mod tile;

pub use error::BoardError;
pub use grid::{Grid, MIN_SIDE};
pub use piece::{CharacterClass, Item, Player};
pub use room::{ItemMove, Room, RoomRegistry, RoomSnapshot, SharedRoom};
pub use tile::{Tile, TileFlag};
