//! Per-room set of players who died in the current cycle.

use std::collections::BTreeSet;

use arena_protocol::{PlayerId, RoomId};

use crate::scoped::RoomScoped;

/// The death registry for all rooms. Every operation is idempotent and
/// infallible; an unknown room simply has nobody dead in it.
pub struct DeathRegistry {
    rooms: RoomScoped<BTreeSet<PlayerId>>,
}

impl DeathRegistry {
    /// Creates a registry with no deaths.
    pub fn new() -> Self {
        Self {
            rooms: RoomScoped::new(),
        }
    }

    /// Marks a player dead for the rest of the cycle. Idempotent.
    pub async fn pronounce(&self, room_id: RoomId, player_id: PlayerId) {
        let scope = self.rooms.get_or_init(room_id).await;
        if scope.lock().await.insert(player_id) {
            tracing::debug!(%room_id, %player_id, "player pronounced dead");
        }
    }

    pub async fn is_dead(&self, room_id: RoomId, player_id: PlayerId) -> bool {
        match self.rooms.get(room_id).await {
            Some(scope) => scope.lock().await.contains(&player_id),
            None => false,
        }
    }

    /// Everyone dead in the room, in id order.
    pub async fn dead(&self, room_id: RoomId) -> Vec<PlayerId> {
        match self.rooms.get(room_id).await {
            Some(scope) => scope.lock().await.iter().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Forgets the room's deaths.
    pub async fn reset(&self, room_id: RoomId) {
        self.rooms.remove(room_id).await;
    }
}

impl Default for DeathRegistry {
    fn default() -> Self {
        Self::new()
    }
}
