//! Wire-level vocabulary for the arena engine.
//!
//! - **Types** ([`PlayerId`], [`Team`], [`Coord`], submission payloads):
//!   what players send in during an action window.
//! - **Events** ([`ServerEvent`], [`UpdateDelta`], [`DuelPayload`]):
//!   what the engine sends back out.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how either is turned into bytes.
//! - **Errors** ([`ProtocolError`], [`ErrorKind`]): the failure taxonomy
//!   shared by every crate in the workspace.
//!
//! ```text
//! Transport (frames) → Protocol (payloads/events) → Engine (board, duels, cycles)
//! ```

mod codec;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{ErrorKind, ProtocolError};
pub use event::{
    DuelPayload, GameStart, ItemChange, MinigameKind, Phase, PlayerChange, PlayerConnected,
    ServerEvent, UpdateDelta,
};
pub use types::{
    AttackPayload, AttackTarget, BonusAttackPayload, Coord, DuelId, ItemId,
    MovePayload, PlayerId, RoomId, SkipPayload, Team,
};
