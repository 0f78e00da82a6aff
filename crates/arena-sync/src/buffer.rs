//! Per-room queues of submitted intents, collected between cycles.
//!
//! One lock guards every room's lists. Submissions are short appends, and
//! a single scope makes "snapshot and clear" trivially atomic.

use std::collections::HashMap;

use arena_protocol::{AttackPayload, BonusAttackPayload, MovePayload, RoomId};
use tokio::sync::Mutex;

use crate::SyncError;

/// The three ordered action lists of one room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSnapshot {
    pub attacks: Vec<AttackPayload>,
    pub moves: Vec<MovePayload>,
    pub bonus_attacks: Vec<BonusAttackPayload>,
}

impl ActionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty() && self.moves.is_empty() && self.bonus_attacks.is_empty()
    }

    fn clear(&mut self) {
        self.attacks.clear();
        self.moves.clear();
        self.bonus_attacks.clear();
    }
}

/// Per-room queues of the current action window.
///
/// A room accepts submissions only after [`start_game`](Self::start_game);
/// before that every call fails with [`SyncError::RoomNotFound`].
#[derive(Default)]
pub struct ActionBuffer {
    rooms: Mutex<HashMap<RoomId, ActionSnapshot>>,
}

impl ActionBuffer {
    /// Creates a buffer with no rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates empty lists for the room. Calling it again keeps whatever
    /// has already been submitted.
    pub async fn start_game(&self, room_id: RoomId) {
        self.rooms.lock().await.entry(room_id).or_default();
    }

    async fn with_room<T>(
        &self,
        room_id: RoomId,
        f: impl FnOnce(&mut ActionSnapshot) -> T,
    ) -> Result<T, SyncError> {
        let mut rooms = self.rooms.lock().await;
        let lists = rooms
            .get_mut(&room_id)
            .ok_or(SyncError::RoomNotFound(room_id))?;
        Ok(f(lists))
    }

    /// Appends an attack to the room's current window.
    pub async fn submit_attack(
        &self,
        room_id: RoomId,
        attack: AttackPayload,
    ) -> Result<(), SyncError> {
        self.with_room(room_id, |lists| lists.attacks.push(attack)).await
    }

    pub async fn submit_move(&self, room_id: RoomId, mv: MovePayload) -> Result<(), SyncError> {
        self.with_room(room_id, |lists| lists.moves.push(mv)).await
    }

    pub async fn submit_bonus_attack(
        &self,
        room_id: RoomId,
        attack: BonusAttackPayload,
    ) -> Result<(), SyncError> {
        self.with_room(room_id, |lists| lists.bonus_attacks.push(attack)).await
    }

    /// Truncates all three lists in place.
    pub async fn reset(&self, room_id: RoomId) -> Result<(), SyncError> {
        self.with_room(room_id, ActionSnapshot::clear).await
    }

    /// Copy of the current lists, leaving them untouched.
    pub async fn peek(&self, room_id: RoomId) -> Result<ActionSnapshot, SyncError> {
        self.with_room(room_id, |lists| lists.clone()).await
    }

    /// Snapshots and clears the room's lists under one lock.
    pub async fn take(&self, room_id: RoomId) -> Result<ActionSnapshot, SyncError> {
        self.with_room(room_id, |lists| {
            let snapshot = lists.clone();
            lists.clear();
            snapshot
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use arena_protocol::{AttackTarget, PlayerId};

    use super::*;

    const ROOM: RoomId = RoomId(1);

    fn mv(player: u64, x: i32) -> MovePayload {
        MovePayload { x, y: 0, prev_x: 0, prev_y: 0, player_id: PlayerId(player) }
    }

    #[tokio::test]
    async fn test_start_game_gives_empty_lists() {
        let buffer = ActionBuffer::new();
        buffer.start_game(ROOM).await;
        assert!(buffer.peek(ROOM).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_before_start_is_not_found() {
        let buffer = ActionBuffer::new();
        let err = buffer.submit_move(ROOM, mv(1, 1)).await.unwrap_err();
        assert!(matches!(err, SyncError::RoomNotFound(_)));
        assert!(buffer.reset(ROOM).await.is_err());
    }

    #[tokio::test]
    async fn test_submissions_keep_fifo_order_then_reset_empties() {
        let buffer = ActionBuffer::new();
        buffer.start_game(ROOM).await;
        for x in 0..3 {
            buffer.submit_move(ROOM, mv(1, x)).await.unwrap();
        }
        buffer
            .submit_attack(ROOM, AttackPayload {
                attacker_id: PlayerId(1),
                defender: AttackTarget::Treasure,
            })
            .await
            .unwrap();
        buffer
            .submit_bonus_attack(ROOM, BonusAttackPayload { x: 1, y: 1, attacker_id: PlayerId(2) })
            .await
            .unwrap();

        let lists = buffer.peek(ROOM).await.unwrap();
        assert_eq!(lists.moves.iter().map(|m| m.x).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(lists.attacks.len(), 1);
        assert_eq!(lists.bonus_attacks.len(), 1);

        buffer.reset(ROOM).await.unwrap();
        assert!(buffer.peek(ROOM).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_game_again_keeps_submissions() {
        let buffer = ActionBuffer::new();
        buffer.start_game(ROOM).await;
        buffer.submit_move(ROOM, mv(1, 1)).await.unwrap();
        buffer.start_game(ROOM).await;
        assert_eq!(buffer.peek(ROOM).await.unwrap().moves.len(), 1);
    }

    #[tokio::test]
    async fn test_take_snapshots_and_clears() {
        let buffer = ActionBuffer::new();
        buffer.start_game(ROOM).await;
        buffer.submit_move(ROOM, mv(1, 2)).await.unwrap();

        let taken = buffer.take(ROOM).await.unwrap();
        assert_eq!(taken.moves, vec![mv(1, 2)]);
        assert!(buffer.peek(ROOM).await.unwrap().is_empty());

        // Lists stay usable for the next window.
        buffer.submit_move(ROOM, mv(1, 3)).await.unwrap();
        assert_eq!(buffer.peek(ROOM).await.unwrap().moves.len(), 1);
    }
}
