//! In-memory pub/sub used when the engine runs in-process.
//!
//! Each subscriber gets a bounded queue of [`ServerEvent`]s. A transport
//! drains the receiver and encodes frames with a
//! [`Codec`](arena_protocol::Codec).

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use arena_protocol::{PlayerId, RoomId, ServerEvent};
use arena_turn::{Hub, HubError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

type Subscribers = HashMap<PlayerId, mpsc::Sender<ServerEvent>>;

/// A [`Hub`] backed by one bounded `mpsc` queue per subscriber.
///
/// Publishing never blocks: a full queue fails a unicast with
/// [`HubError::Full`] and is skipped by a broadcast.
pub struct ChannelHub {
    buffer: usize,
    rooms: RwLock<HashMap<RoomId, Subscribers>>,
}

impl ChannelHub {
    /// Creates a hub whose subscriber queues hold `buffer` events each
    /// (at least one).
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribes `player_id` to the room's events, replacing any earlier
    /// subscription of the same player.
    pub fn subscribe(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(room_id)
            .or_default()
            .insert(player_id, tx);
        tracing::debug!(%room_id, %player_id, "subscribed");
        rx
    }

    /// Drops a subscription. Returns `true` if there was one.
    pub fn unsubscribe(&self, room_id: RoomId, player_id: PlayerId) -> bool {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let Some(subscribers) = rooms.get_mut(&room_id) else {
            return false;
        };
        let removed = subscribers.remove(&player_id).is_some();
        if subscribers.is_empty() {
            rooms.remove(&room_id);
        }
        removed
    }

    /// Live subscriptions in the room.
    pub fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&room_id)
            .map_or(0, HashMap::len)
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Hub for ChannelHub {
    fn publish(
        &self,
        room_id: RoomId,
        recipient: PlayerId,
        event: &ServerEvent,
    ) -> Result<(), HubError> {
        let not_subscribed = || HubError::NotSubscribed {
            room_id,
            player_id: recipient,
        };
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        let sender = rooms
            .get(&room_id)
            .and_then(|subscribers| subscribers.get(&recipient))
            .ok_or_else(not_subscribed)?;
        sender.try_send(event.clone()).map_err(|err| match err {
            TrySendError::Full(_) => HubError::Full(recipient),
            TrySendError::Closed(_) => not_subscribed(),
        })
    }

    fn publish_to_all(&self, room_id: RoomId, event: &ServerEvent) {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        let Some(subscribers) = rooms.get(&room_id) else {
            return;
        };
        for (player_id, sender) in subscribers {
            if let Err(err) = sender.try_send(event.clone()) {
                tracing::debug!(
                    %room_id,
                    %player_id,
                    event = event.event_type(),
                    %err,
                    "broadcast skipped subscriber"
                );
            }
        }
    }
}
