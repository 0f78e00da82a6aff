//! The outbound port: how the turn processor reaches clients.

use arena_protocol::{ErrorKind, PlayerId, RoomId, ServerEvent};

/// Errors from delivering an event to one player.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The recipient has no live subscription in the room.
    #[error("player {player_id} is not subscribed to room {room_id}")]
    NotSubscribed { room_id: RoomId, player_id: PlayerId },

    /// The recipient's queue is full.
    #[error("outbound queue of player {0} is full")]
    Full(PlayerId),
}

impl HubError {
    /// Every delivery failure aborts the duel being set up.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Aborted
    }
}

/// Room-scoped publish/subscribe, implemented by the transport.
///
/// Both calls are synchronous: an implementation enqueues and returns.
pub trait Hub: Send + Sync + 'static {
    /// Sends `event` to one player.
    ///
    /// # Errors
    /// Fails if the player can't be reached; the processor aborts the duel
    /// it was setting up.
    fn publish(
        &self,
        room_id: RoomId,
        recipient: PlayerId,
        event: &ServerEvent,
    ) -> Result<(), HubError>;

    /// Sends `event` to everyone in the room. Best effort.
    fn publish_to_all(&self, room_id: RoomId, event: &ServerEvent);
}
