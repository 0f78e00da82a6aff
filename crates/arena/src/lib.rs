//! # Arena
//!
//! Resolution engine for a room-based, real-time arena game.
//!
//! Players submit attacks, moves, and bonus attacks during an action
//! window. [`ArenaService::proceed`] closes the window and runs one cycle
//! in the background: attack, move, bonus attack, and collision phases,
//! then item pickup and a single aggregated "Update" broadcast. Duels
//! pause the cycle until both duelists have reported through
//! [`ArenaService::register_duel_result`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arena::prelude::*;
//!
//! # async fn demo() -> Result<(), ArenaError> {
//! let arena = ArenaService::new(ArenaConfig::default());
//! let room = arena.create_room(8, 8, ["gold"]).await?;
//! let ash = arena.create_character(room, "ash", "fighter", Team::First).await?;
//! let mut events = arena.connect(room, ash).await?;
//!
//! arena.start_game(room).await?;
//! arena
//!     .submit_move(room, MovePayload { x: 3, y: 3, prev_x: 6, prev_y: 1, player_id: ash })
//!     .await?;
//! arena.proceed(room).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.event_type());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod hub;
mod service;
pub mod telemetry;

pub use config::ArenaConfig;
pub use error::ArenaError;
pub use hub::ChannelHub;
pub use service::ArenaService;

pub use arena_board::{CharacterClass, RoomSnapshot};
pub use arena_protocol as protocol;
pub use arena_sync::Resolution;
pub use arena_turn::{Hub, HubError};

/// Everything needed to drive the engine from a transport.
pub mod prelude {
    pub use crate::{
        ArenaConfig, ArenaError, ArenaService, ChannelHub, Hub, Resolution, RoomSnapshot,
    };
    pub use arena_protocol::{
        AttackPayload, AttackTarget, BonusAttackPayload, Codec, Coord, DuelId, DuelPayload,
        ErrorKind, JsonCodec, MovePayload, Phase, PlayerId, RoomId, ServerEvent, SkipPayload,
        Team, UpdateDelta,
    };
}
