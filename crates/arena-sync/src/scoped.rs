//! Per-room state behind one lock per room.

use std::collections::HashMap;
use std::sync::Arc;

use arena_protocol::RoomId;
use tokio::sync::{Mutex, RwLock};

/// A map of rooms to independently locked state.
///
/// The outer `RwLock` is held only for the lookup; callers then lock the
/// room's own `Mutex`, so two rooms never serialize on each other.
pub(crate) struct RoomScoped<T> {
    rooms: RwLock<HashMap<RoomId, Arc<Mutex<T>>>>,
}

impl<T: Default> RoomScoped<T> {
    pub(crate) fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn get(&self, room_id: RoomId) -> Option<Arc<Mutex<T>>> {
        self.rooms.read().await.get(&room_id).cloned()
    }

    pub(crate) async fn get_or_init(&self, room_id: RoomId) -> Arc<Mutex<T>> {
        if let Some(scope) = self.get(room_id).await {
            return scope;
        }
        let mut rooms = self.rooms.write().await;
        Arc::clone(rooms.entry(room_id).or_default())
    }

    pub(crate) async fn remove(&self, room_id: RoomId) {
        self.rooms.write().await.remove(&room_id);
    }
}
