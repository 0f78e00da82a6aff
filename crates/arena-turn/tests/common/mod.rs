//! Shared fixtures: a hub that records everything and a wired-up engine.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use arena_board::RoomRegistry;
use arena_protocol::{DuelPayload, MinigameKind, PlayerId, RoomId, ServerEvent};
use arena_sync::{DeathRegistry, DuelArbiter, SyncGate};
use arena_turn::{Hub, HubError, TurnProcessor};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    To(PlayerId, ServerEvent),
    All(ServerEvent),
}

/// Records every publish. Unicasts to players in `unreachable` fail.
#[derive(Default)]
pub struct RecordingHub {
    sent: Mutex<Vec<Sent>>,
    unreachable: Mutex<HashSet<PlayerId>>,
}

impl RecordingHub {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn cut_off(&self, player: PlayerId) {
        self.unreachable.lock().unwrap().insert(player);
    }

    pub fn fights_to(&self, player: PlayerId) -> Vec<DuelPayload> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::To(p, ServerEvent::Fight(duel)) if p == player => Some(duel),
                _ => None,
            })
            .collect()
    }

    /// Every duel issued so far, once each, in issue order.
    pub fn duels(&self) -> Vec<DuelPayload> {
        let mut duels: Vec<DuelPayload> = Vec::new();
        for sent in self.sent() {
            if let Sent::To(_, ServerEvent::Fight(duel)) = sent {
                if !duels.iter().any(|d| d.duel_id == duel.duel_id) {
                    duels.push(duel);
                }
            }
        }
        duels
    }

    pub fn broadcasts(&self) -> Vec<ServerEvent> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::All(event) => Some(event),
                Sent::To(..) => None,
            })
            .collect()
    }
}

impl Hub for RecordingHub {
    fn publish(
        &self,
        room_id: RoomId,
        recipient: PlayerId,
        event: &ServerEvent,
    ) -> Result<(), HubError> {
        if self.unreachable.lock().unwrap().contains(&recipient) {
            return Err(HubError::NotSubscribed {
                room_id,
                player_id: recipient,
            });
        }
        self.sent.lock().unwrap().push(Sent::To(recipient, event.clone()));
        Ok(())
    }

    fn publish_to_all(&self, _room_id: RoomId, event: &ServerEvent) {
        self.sent.lock().unwrap().push(Sent::All(event.clone()));
    }
}

pub struct Engine {
    pub rooms: Arc<RoomRegistry>,
    pub arbiter: Arc<DuelArbiter>,
    pub deaths: Arc<DeathRegistry>,
    pub gate: Arc<SyncGate>,
    pub hub: Arc<RecordingHub>,
    pub processor: Arc<TurnProcessor<RecordingHub>>,
}

impl Engine {
    pub fn new() -> Self {
        let rooms = Arc::new(RoomRegistry::new());
        let arbiter = Arc::new(DuelArbiter::new());
        let deaths = Arc::new(DeathRegistry::new());
        let gate = Arc::new(SyncGate::new());
        let hub = Arc::new(RecordingHub::default());
        let processor = Arc::new(TurnProcessor::new(
            Arc::clone(&rooms),
            Arc::clone(&arbiter),
            Arc::clone(&deaths),
            Arc::clone(&gate),
            Arc::clone(&hub),
            MinigameKind::CATALOG.to_vec(),
        ));
        Self { rooms, arbiter, deaths, gate, hub, processor }
    }

    /// What the result handler does: record, and on resolution pronounce
    /// the loser and release both duelists.
    pub async fn report(
        &self,
        room_id: RoomId,
        duel: &DuelPayload,
        submitter: PlayerId,
        winner: PlayerId,
    ) {
        let resolution = self
            .arbiter
            .register_result(room_id, duel.duel_id, submitter, winner)
            .await
            .unwrap();
        if resolution.ready {
            if let Some(loser) = resolution.duel.loser() {
                self.deaths.pronounce(room_id, loser).await;
            }
            self.gate.close(room_id, duel.attacker_id).await.unwrap();
            self.gate.close(room_id, duel.defender_id).await.unwrap();
        }
    }

    /// Resolves `duel` with `winner` reported by both sides.
    pub async fn settle(&self, room_id: RoomId, duel: &DuelPayload, winner: PlayerId) {
        self.report(room_id, duel, duel.attacker_id, winner).await;
        self.report(room_id, duel, duel.defender_id, winner).await;
    }
}

/// Polls until `count` distinct duels have been issued.
pub async fn wait_for_duels(hub: &RecordingHub, count: usize) -> Vec<DuelPayload> {
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        loop {
            let duels = hub.duels();
            if duels.len() >= count {
                return duels;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("duel was never issued")
}

/// Polls until `player` has received `count` fights.
pub async fn wait_for_fights(
    hub: &RecordingHub,
    player: PlayerId,
    count: usize,
) -> Vec<DuelPayload> {
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        loop {
            let fights = hub.fights_to(player);
            if fights.len() >= count {
                return fights;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("fight was never sent")
}
