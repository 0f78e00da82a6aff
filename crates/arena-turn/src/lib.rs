//! Resolution cycles for the arena engine.
//!
//! [`TurnProcessor::process`] runs the phase pipeline for one room over a
//! drained [`ActionSnapshot`](arena_sync::ActionSnapshot). It talks to
//! clients only through the [`Hub`] port and parks on the
//! [`SyncGate`](arena_sync::SyncGate) whenever it needs duel results.

mod delta;
mod error;
mod hub;
mod processor;
pub mod tournament;

pub use delta::UpdateBuilder;
pub use error::TurnError;
pub use hub::{Hub, HubError};
pub use processor::TurnProcessor;
pub use tournament::{Bout, BoutOutcome, Tournament};
