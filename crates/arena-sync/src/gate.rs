//! Per-room, per-player one-shot barriers.
//!
//! The turn processor opens a barrier for both duelists when it issues a
//! duel, then suspends in [`SyncGate::await_player`] or
//! [`SyncGate::await_all`]. Whichever request handler records the second
//! duel result calls [`SyncGate::close`], waking every waiter on that
//! barrier exactly once.
//!
//! # Lifecycle
//!
//! ```text
//! open() ──→ [Open] ──close()──→ (removed, waiters woken)
//!                 └──force_close_all()──┘
//! ```
//!
//! Each barrier is a `watch` channel holding `false` until closed. A
//! waiter subscribes under the room lock and waits outside it, so a close
//! racing a late subscriber can never be missed.

use std::collections::HashMap;

use arena_protocol::{PlayerId, RoomId};
use futures_util::future::join_all;
use tokio::sync::watch;

use crate::SyncError;
use crate::scoped::RoomScoped;

type Barriers = HashMap<PlayerId, watch::Sender<bool>>;

/// The synchronization gate for all rooms.
pub struct SyncGate {
    rooms: RoomScoped<Barriers>,
}

impl SyncGate {
    /// Creates a gate with no rooms.
    pub fn new() -> Self {
        Self {
            rooms: RoomScoped::new(),
        }
    }

    /// Creates the room's barrier scope. Idempotent.
    pub async fn initialize(&self, room_id: RoomId) {
        self.rooms.get_or_init(room_id).await;
    }

    async fn barriers(
        &self,
        room_id: RoomId,
    ) -> Result<std::sync::Arc<tokio::sync::Mutex<Barriers>>, SyncError> {
        self.rooms
            .get(room_id)
            .await
            .ok_or(SyncError::RoomNotFound(room_id))
    }

    /// Opens a barrier for one player.
    ///
    /// # Errors
    /// - [`SyncError::RoomNotFound`] if the room was never initialized
    /// - [`SyncError::AlreadyOpen`] if the player already has a barrier
    pub async fn open(&self, room_id: RoomId, player_id: PlayerId) -> Result<(), SyncError> {
        let scope = self.barriers(room_id).await?;
        let mut barriers = scope.lock().await;
        if barriers.contains_key(&player_id) {
            return Err(SyncError::AlreadyOpen(player_id));
        }
        barriers.insert(player_id, watch::channel(false).0);
        Ok(())
    }

    /// Opens barriers for both players, or for neither.
    pub async fn open_pair(
        &self,
        room_id: RoomId,
        first: PlayerId,
        second: PlayerId,
    ) -> Result<(), SyncError> {
        if first == second {
            return Err(SyncError::SelfDuel(first));
        }
        let scope = self.barriers(room_id).await?;
        let mut barriers = scope.lock().await;
        for player_id in [first, second] {
            if barriers.contains_key(&player_id) {
                return Err(SyncError::AlreadyOpen(player_id));
            }
        }
        barriers.insert(first, watch::channel(false).0);
        barriers.insert(second, watch::channel(false).0);
        Ok(())
    }

    /// Wakes every waiter on the player's barrier and removes it.
    ///
    /// # Errors
    /// [`SyncError::BarrierNotFound`] if there is no open barrier, which
    /// includes closing the same barrier twice.
    pub async fn close(&self, room_id: RoomId, player_id: PlayerId) -> Result<(), SyncError> {
        let scope = self.barriers(room_id).await?;
        let sender = scope
            .lock()
            .await
            .remove(&player_id)
            .ok_or(SyncError::BarrierNotFound(player_id))?;
        sender.send_replace(true);
        Ok(())
    }

    /// Blocks until the player's barrier is closed. Returns immediately if
    /// the player has no barrier.
    pub async fn await_player(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<(), SyncError> {
        let receiver = {
            let scope = self.barriers(room_id).await?;
            let barriers = scope.lock().await;
            barriers.get(&player_id).map(watch::Sender::subscribe)
        };
        if let Some(receiver) = receiver {
            wait_closed(receiver).await;
        }
        Ok(())
    }

    /// Blocks until every barrier open at call time is closed. Barriers
    /// opened afterwards are not waited for.
    pub async fn await_all(&self, room_id: RoomId) -> Result<(), SyncError> {
        let receivers: Vec<_> = {
            let scope = self.barriers(room_id).await?;
            let barriers = scope.lock().await;
            barriers.values().map(watch::Sender::subscribe).collect()
        };
        tracing::debug!(%room_id, pending = receivers.len(), "waiting for open barriers");
        join_all(receivers.into_iter().map(wait_closed)).await;
        Ok(())
    }

    /// Closes every open barrier in the room. Returns how many were open.
    pub async fn force_close_all(&self, room_id: RoomId) -> Result<usize, SyncError> {
        let scope = self.barriers(room_id).await?;
        let drained: Vec<_> = scope.lock().await.drain().collect();
        for (player_id, sender) in &drained {
            tracing::warn!(%room_id, %player_id, "forcing barrier closed");
            sender.send_replace(true);
        }
        Ok(drained.len())
    }

    /// `true` while the player has an open barrier.
    pub async fn is_open(&self, room_id: RoomId, player_id: PlayerId) -> bool {
        match self.rooms.get(room_id).await {
            Some(scope) => scope.lock().await.contains_key(&player_id),
            None => false,
        }
    }

    pub async fn open_count(&self, room_id: RoomId) -> usize {
        match self.rooms.get(room_id).await {
            Some(scope) => scope.lock().await.len(),
            None => 0,
        }
    }
}

impl Default for SyncGate {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_closed(mut receiver: watch::Receiver<bool>) {
    // A dropped sender counts as closed.
    let _ = receiver.wait_for(|closed| *closed).await;
}
