//! Coordination primitives shared between request handlers and the
//! background turn processor.
//!
//! | type | role |
//! |---|---|
//! | [`ActionBuffer`] | per-room queues of submitted intents |
//! | [`DeathRegistry`] | per-room set of players killed this cycle |
//! | [`SyncGate`] | per-player barriers the processor suspends on |
//! | [`DuelArbiter`] | per-room duels and their result consensus |
//!
//! Every registry keeps one lock per room, so work in one room never
//! waits on another.

mod arbiter;
mod buffer;
mod death;
mod error;
mod gate;
mod scoped;

pub use arbiter::{Duel, DuelArbiter, DuelState, Resolution};
pub use buffer::{ActionBuffer, ActionSnapshot};
pub use death::DeathRegistry;
pub use error::SyncError;
pub use gate::SyncGate;
