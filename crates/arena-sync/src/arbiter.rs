//! Ephemeral duels and the two-submission consensus that resolves them.
//!
//! A duel is created by the turn processor, then each duelist reports the
//! winner through its own request. The duel is resolved exactly when the
//! second distinct duelist has reported; later reports are accepted and
//! ignored.
//!
//! ```text
//! create() ──→ Open ──1st submit──→ OneSubmitted ──2nd submit──→ Resolved
//!                                                   (ready = true, once)
//! ```
//!
//! The first accepted report fixes the winner. Disagreement between the
//! two reports is not arbitrated.

use std::collections::HashMap;

use arena_protocol::{DuelId, DuelPayload, MinigameKind, PlayerId, RoomId};
use rand::Rng;

use crate::SyncError;
use crate::scoped::RoomScoped;

/// How far a duel has progressed. See the module docs for the
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelState {
    Open,
    OneSubmitted,
    Resolved,
}

/// One duel between an attacker and a defender.
#[derive(Debug, Clone)]
pub struct Duel {
    pub id: DuelId,
    pub kind: MinigameKind,
    pub attacker: PlayerId,
    pub defender: PlayerId,
    /// Set by the first accepted submission.
    pub winner: Option<PlayerId>,
    submitters: Vec<PlayerId>,
    state: DuelState,
}

impl Duel {
    fn new(id: DuelId, kind: MinigameKind, attacker: PlayerId, defender: PlayerId) -> Self {
        Self {
            id,
            kind,
            attacker,
            defender,
            winner: None,
            submitters: Vec::with_capacity(2),
            state: DuelState::Open,
        }
    }

    pub fn state(&self) -> DuelState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state == DuelState::Resolved
    }

    pub fn involves(&self, player: PlayerId) -> bool {
        player == self.attacker || player == self.defender
    }

    /// The duelist who did not win, once a winner is known.
    pub fn loser(&self) -> Option<PlayerId> {
        self.winner.map(|winner| {
            if winner == self.attacker {
                self.defender
            } else {
                self.attacker
            }
        })
    }

    /// The body sent in "Fight" and "FightResult" events.
    pub fn payload(&self) -> DuelPayload {
        DuelPayload {
            duel_id: self.id,
            kind: self.kind,
            attacker_id: self.attacker,
            defender_id: self.defender,
            winner_id: self.winner,
        }
    }

    fn submit(&mut self, submitter: PlayerId, winner: PlayerId) -> bool {
        if self.winner.is_none() {
            self.winner = Some(winner);
        }
        if !self.submitters.contains(&submitter) {
            self.submitters.push(submitter);
        }
        let before = self.state;
        self.state = match self.submitters.len() {
            0 => DuelState::Open,
            1 => DuelState::OneSubmitted,
            _ => DuelState::Resolved,
        };
        before != DuelState::Resolved && self.state == DuelState::Resolved
    }
}

/// Outcome of [`DuelArbiter::register_result`].
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The duel after the submission was applied.
    pub duel: Duel,
    /// `true` only for the submission that resolved the duel.
    pub ready: bool,
}

/// Per-room registry of duels.
pub struct DuelArbiter {
    rooms: RoomScoped<HashMap<DuelId, Duel>>,
}

impl DuelArbiter {
    /// Creates an arbiter with no duels.
    pub fn new() -> Self {
        Self {
            rooms: RoomScoped::new(),
        }
    }

    /// Stores a new unresolved duel under an id unused in the room.
    pub async fn create(
        &self,
        room_id: RoomId,
        kind: MinigameKind,
        attacker: PlayerId,
        defender: PlayerId,
    ) -> Result<Duel, SyncError> {
        if attacker == defender {
            return Err(SyncError::SelfDuel(attacker));
        }
        let scope = self.rooms.get_or_init(room_id).await;
        let mut duels = scope.lock().await;

        let mut rng = rand::rng();
        let id = loop {
            let candidate = DuelId(rng.random());
            if !duels.contains_key(&candidate) {
                break candidate;
            }
        };
        let duel = Duel::new(id, kind, attacker, defender);
        duels.insert(id, duel.clone());
        tracing::info!(%room_id, duel_id = %id, %attacker, %defender, ?kind, "duel created");
        Ok(duel)
    }

    /// Records one duelist's report of the winner.
    ///
    /// # Errors
    /// - [`SyncError::RoomNotFound`] if the room has never had a duel
    /// - [`SyncError::DuelNotFound`] if the id is unknown in the room
    /// - [`SyncError::NotADuelist`] if the submitter or the claimed winner
    ///   is neither the attacker nor the defender
    ///
    /// A report on an already resolved duel is not an error: it returns
    /// the duel unchanged with `ready == false`.
    pub async fn register_result(
        &self,
        room_id: RoomId,
        duel_id: DuelId,
        submitter: PlayerId,
        winner: PlayerId,
    ) -> Result<Resolution, SyncError> {
        let scope = self
            .rooms
            .get(room_id)
            .await
            .ok_or(SyncError::RoomNotFound(room_id))?;
        let mut duels = scope.lock().await;
        let duel = duels
            .get_mut(&duel_id)
            .ok_or(SyncError::DuelNotFound(duel_id))?;

        if duel.is_resolved() {
            tracing::debug!(%room_id, %duel_id, %submitter, "result for resolved duel ignored");
            return Ok(Resolution {
                duel: duel.clone(),
                ready: false,
            });
        }
        for player in [submitter, winner] {
            if !duel.involves(player) {
                return Err(SyncError::NotADuelist { duel: duel_id, player });
            }
        }

        let ready = duel.submit(submitter, winner);
        if ready {
            tracing::info!(%room_id, %duel_id, winner = ?duel.winner, "duel resolved");
        }
        Ok(Resolution { duel: duel.clone(), ready })
    }

    /// Returns a copy of a duel.
    pub async fn get(&self, room_id: RoomId, duel_id: DuelId) -> Result<Duel, SyncError> {
        let scope = self
            .rooms
            .get(room_id)
            .await
            .ok_or(SyncError::RoomNotFound(room_id))?;
        let duels = scope.lock().await;
        duels
            .get(&duel_id)
            .cloned()
            .ok_or(SyncError::DuelNotFound(duel_id))
    }

    /// Drops a duel whose setup failed before both duelists were told.
    pub async fn discard(&self, room_id: RoomId, duel_id: DuelId) -> bool {
        match self.rooms.get(room_id).await {
            Some(scope) => scope.lock().await.remove(&duel_id).is_some(),
            None => false,
        }
    }

    /// Discards every resolved duel of the room. Returns how many went.
    pub async fn prune_resolved(&self, room_id: RoomId) -> usize {
        let Some(scope) = self.rooms.get(room_id).await else {
            return 0;
        };
        let mut duels = scope.lock().await;
        let before = duels.len();
        duels.retain(|_, duel| !duel.is_resolved());
        before - duels.len()
    }

    /// Drops every duel of the room, resolved or not. Returns how many
    /// went.
    ///
    /// Called whenever the room's barriers are force-released: a duel
    /// whose barriers are gone can no longer resume the cycle that issued
    /// it, so a late report on it must not reach a later cycle.
    pub async fn clear(&self, room_id: RoomId) -> usize {
        let Some(scope) = self.rooms.get(room_id).await else {
            return 0;
        };
        let mut duels = scope.lock().await;
        let cleared = duels.len();
        duels.clear();
        if cleared > 0 {
            tracing::warn!(%room_id, cleared, "abandoned duels discarded");
        }
        cleared
    }

    /// Duels currently held for the room, resolved or not.
    pub async fn duel_count(&self, room_id: RoomId) -> usize {
        match self.rooms.get(room_id).await {
            Some(scope) => scope.lock().await.len(),
            None => 0,
        }
    }
}

impl Default for DuelArbiter {
    fn default() -> Self {
        Self::new()
    }
}
