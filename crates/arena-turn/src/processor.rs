//! The per-cycle phase pipeline.
//!
//! ```text
//! Attack ─→ Move ─→ BonusAttack ─→ CollisionResolution ─→ pickup ─→ Update
//!   │                  │                 │
//!   └─ await duels ────┴─ await duels ───┴─ tournament bouts
//! ```
//!
//! Each named phase is broadcast before it starts. The processor only
//! suspends on the [`SyncGate`]; every other step runs straight through.
//! The room lock is never held across a gate wait, so result handlers and
//! snapshots keep working while a cycle is parked.

use std::collections::HashSet;
use std::sync::Arc;

use arena_board::{RoomRegistry, SharedRoom};
use arena_protocol::{
    AttackPayload, AttackTarget, BonusAttackPayload, Coord, DuelId, MinigameKind, MovePayload,
    Phase, PlayerId, RoomId, ServerEvent, Team, UpdateDelta,
};
use arena_sync::{ActionSnapshot, DeathRegistry, DuelArbiter, SyncGate};
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::tournament::{BoutOutcome, Tournament};
use crate::{Hub, TurnError, UpdateBuilder};

/// Randomness players can observe and might try to predict.
fn secure_rng() -> impl rand::CryptoRng + Send {
    OsRng.unwrap_err()
}

/// State local to one `process` call.
struct Cycle {
    room_id: RoomId,
    room: SharedRoom,
    updates: UpdateBuilder,
    /// Players whose death has already been resolved this cycle.
    processed: HashSet<PlayerId>,
}

/// Runs resolution cycles. Shares its registries with the request
/// handlers that feed them.
pub struct TurnProcessor<H> {
    rooms: Arc<RoomRegistry>,
    arbiter: Arc<DuelArbiter>,
    deaths: Arc<DeathRegistry>,
    gate: Arc<SyncGate>,
    hub: Arc<H>,
    minigames: Vec<MinigameKind>,
}

impl<H: Hub> TurnProcessor<H> {
    /// Wires a processor to the registries it shares with the request
    /// handlers. `minigames` is the catalog duel kinds are drawn from.
    pub fn new(
        rooms: Arc<RoomRegistry>,
        arbiter: Arc<DuelArbiter>,
        deaths: Arc<DeathRegistry>,
        gate: Arc<SyncGate>,
        hub: Arc<H>,
        minigames: Vec<MinigameKind>,
    ) -> Self {
        Self {
            rooms,
            arbiter,
            deaths,
            gate,
            hub,
            minigames,
        }
    }

    /// Runs one full cycle over already drained action lists and returns
    /// the delta that was broadcast.
    ///
    /// The room's death set is cleared on entry and on exit, whether or
    /// not the cycle succeeded.
    ///
    /// # Errors
    /// Any board, gate, arbiter, or unicast failure aborts the remaining
    /// phases. Dead attackers and bonus attacks without a target are not
    /// errors.
    pub async fn process(
        &self,
        room_id: RoomId,
        actions: ActionSnapshot,
    ) -> Result<UpdateDelta, TurnError> {
        let room = self.rooms.get(room_id).await?;
        self.deaths.reset(room_id).await;

        let mut cycle = Cycle {
            room_id,
            room,
            updates: UpdateBuilder::new(),
            processed: HashSet::new(),
        };
        tracing::info!(
            %room_id,
            attacks = actions.attacks.len(),
            moves = actions.moves.len(),
            bonus_attacks = actions.bonus_attacks.len(),
            "cycle started"
        );

        let result = self.run_phases(&mut cycle, actions).await;

        self.deaths.reset(room_id).await;
        let pruned = self.arbiter.prune_resolved(room_id).await;
        match &result {
            Ok(delta) => tracing::info!(
                %room_id,
                players = delta.player_changes.len(),
                items = delta.item_changes.len(),
                pruned,
                "cycle finished"
            ),
            Err(err) => {
                tracing::error!(%room_id, error = %err, kind = %err.kind(), "cycle aborted")
            }
        }
        result
    }

    async fn run_phases(
        &self,
        cycle: &mut Cycle,
        actions: ActionSnapshot,
    ) -> Result<UpdateDelta, TurnError> {
        self.announce(cycle.room_id, Phase::Attack);
        self.attack_phase(cycle, &actions.attacks).await?;

        self.announce(cycle.room_id, Phase::Move);
        self.move_phase(cycle, &actions.moves).await?;

        self.announce(cycle.room_id, Phase::BonusAttack);
        self.bonus_attack_phase(cycle, &actions.bonus_attacks).await?;

        self.announce(cycle.room_id, Phase::CollisionResolution);
        self.collision_phase(cycle).await?;

        self.item_pickup(cycle).await?;

        let delta = std::mem::take(&mut cycle.updates).build();
        self.hub
            .publish_to_all(cycle.room_id, &ServerEvent::Update(delta.clone()));
        Ok(delta)
    }

    fn announce(&self, room_id: RoomId, phase: Phase) {
        tracing::debug!(%room_id, %phase, "phase started");
        self.hub.publish_to_all(room_id, &ServerEvent::Phase(phase));
    }

    async fn is_dead(&self, room_id: RoomId, player_id: PlayerId) -> bool {
        self.deaths.is_dead(room_id, player_id).await
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn attack_phase(
        &self,
        cycle: &mut Cycle,
        attacks: &[AttackPayload],
    ) -> Result<(), TurnError> {
        let room_id = cycle.room_id;
        for attack in attacks {
            let attacker = attack.attacker_id;
            if self.is_dead(room_id, attacker).await {
                tracing::debug!(%room_id, %attacker, "dead attacker skipped");
                continue;
            }
            match attack.defender {
                AttackTarget::Treasure => {
                    let mut room = cycle.room.lock().await;
                    let team = room.player(attacker)?.team;
                    let moved = room.disperse_treasure(team, &mut rand::rng())?;
                    tracing::info!(
                        %room_id,
                        %attacker,
                        %team,
                        items = moved.len(),
                        "treasure dispersed"
                    );
                    for item in moved {
                        cycle.updates.record_item(item);
                    }
                }
                AttackTarget::Player(defender) => {
                    {
                        let room = cycle.room.lock().await;
                        room.player(attacker)?;
                        room.player(defender)?;
                    }
                    if self.is_dead(room_id, defender).await {
                        tracing::debug!(
                            %room_id,
                            %attacker,
                            %defender,
                            "attack on dead defender skipped"
                        );
                        continue;
                    }
                    self.start_duel(room_id, attacker, defender).await?;
                }
            }
        }
        self.gate.await_all(room_id).await?;
        self.resolve_deaths(cycle).await
    }

    async fn move_phase(&self, cycle: &mut Cycle, moves: &[MovePayload]) -> Result<(), TurnError> {
        let room_id = cycle.room_id;
        for mv in moves {
            let player_id = mv.player_id;
            if self.is_dead(room_id, player_id).await {
                tracing::debug!(%room_id, %player_id, "dead player's move skipped");
                continue;
            }
            let mut room = cycle.room.lock().await;
            let to = mv.target();
            let from = room.relocate_player(player_id, to)?;
            let carried = room.player(player_id)?.carried;
            cycle.updates.record_player(player_id, from, to, carried);
        }
        Ok(())
    }

    async fn bonus_attack_phase(
        &self,
        cycle: &mut Cycle,
        bonus_attacks: &[BonusAttackPayload],
    ) -> Result<(), TurnError> {
        let room_id = cycle.room_id;
        for bonus in bonus_attacks {
            let attacker = bonus.attacker_id;
            if self.is_dead(room_id, attacker).await {
                tracing::debug!(%room_id, %attacker, "dead bonus attacker skipped");
                continue;
            }
            let enemies: Vec<PlayerId> = {
                let room = cycle.room.lock().await;
                let team = room.player(attacker)?.team;
                let tile = room.grid().tile(bonus.target())?;
                let enemies = tile
                    .occupants()
                    .iter()
                    .copied()
                    .filter(|id| room.player(*id).is_ok_and(|p| p.team != team))
                    .collect();
                enemies
            };

            let mut target = None;
            for enemy in enemies {
                if !self.is_dead(room_id, enemy).await {
                    target = Some(enemy);
                    break;
                }
            }
            match target {
                Some(defender) => {
                    self.start_duel(room_id, attacker, defender).await?;
                }
                None => {
                    tracing::debug!(
                        %room_id,
                        %attacker,
                        target = %bonus.target(),
                        "bonus attack void"
                    );
                }
            }
        }
        self.gate.await_all(room_id).await?;
        self.resolve_deaths(cycle).await
    }

    async fn collision_phase(&self, cycle: &mut Cycle) -> Result<(), TurnError> {
        let room_id = cycle.room_id;
        let crowded: Vec<(Coord, Vec<(PlayerId, Team)>)> = {
            let room = cycle.room.lock().await;
            let grid = room.grid();
            let mut crowded = Vec::new();
            for at in grid.non_empty_tiles() {
                let tile = grid.tile(at)?;
                if tile.is_special() || tile.occupants().len() < 2 {
                    continue;
                }
                let mut occupants = Vec::with_capacity(tile.occupants().len());
                for &id in tile.occupants() {
                    occupants.push((id, room.player(id)?.team));
                }
                crowded.push((at, occupants));
            }
            crowded
        };

        for (at, occupants) in crowded {
            let mut sides: [Vec<PlayerId>; 2] = [Vec::new(), Vec::new()];
            for (id, team) in occupants {
                if !self.is_dead(room_id, id).await {
                    sides[team.index()].push(id);
                }
            }
            let [first, second] = sides;
            self.run_tournament(cycle, at, first, second).await?;
        }

        self.gate.await_all(room_id).await?;
        self.resolve_deaths(cycle).await
    }

    async fn run_tournament(
        &self,
        cycle: &mut Cycle,
        at: Coord,
        first: Vec<PlayerId>,
        second: Vec<PlayerId>,
    ) -> Result<(), TurnError> {
        let room_id = cycle.room_id;
        let mut rng = secure_rng();
        let Some(mut tournament) = Tournament::begin(first, second, &mut rng) else {
            return Ok(());
        };
        tracing::info!(
            %room_id,
            tile = %at,
            champion = %tournament.champion(),
            "tile tournament started"
        );

        while !tournament.is_over() {
            let fallen = tournament.champion();
            if self.is_dead(room_id, fallen).await {
                match tournament.replace_champion(&mut rng) {
                    Some(champion) => {
                        tracing::info!(
                            %room_id,
                            tile = %at,
                            %fallen,
                            %champion,
                            "champion replaced"
                        );
                        continue;
                    }
                    None => {
                        tracing::info!(%room_id, tile = %at, %fallen, "champion side exhausted");
                        break;
                    }
                }
            }
            let Some(bout) = tournament.next_bout(&mut rng) else {
                break;
            };
            self.start_duel(room_id, bout.champion, bout.challenger).await?;
            self.gate.await_player(room_id, bout.champion).await?;
            self.gate.await_player(room_id, bout.challenger).await?;
            self.resolve_deaths(cycle).await?;

            let champion_dead = self.is_dead(room_id, bout.champion).await;
            let challenger_dead = self.is_dead(room_id, bout.challenger).await;
            if BoutOutcome::is_fallback(champion_dead, challenger_dead) {
                tracing::warn!(
                    %room_id,
                    champion = %bout.champion,
                    challenger = %bout.challenger,
                    champion_dead,
                    "bout without a single loser, challenger eliminated"
                );
            }
            tournament.settle(BoutOutcome::from_deaths(champion_dead, challenger_dead));
        }

        if let Some(survivor) = tournament.survivor() {
            let standing = !self.is_dead(room_id, survivor).await;
            tracing::info!(%room_id, tile = %at, %survivor, standing, "tile tournament finished");
        }
        Ok(())
    }

    async fn item_pickup(&self, cycle: &mut Cycle) -> Result<(), TurnError> {
        let room_id = cycle.room_id;
        let mut rng = secure_rng();
        let mut room = cycle.room.lock().await;

        let contested: Vec<(Coord, Vec<PlayerId>)> = {
            let grid = room.grid();
            let mut contested = Vec::new();
            for at in grid.non_empty_tiles() {
                let tile = grid.tile(at)?;
                if !tile.items().is_empty() && !tile.occupants().is_empty() {
                    contested.push((at, tile.occupants().to_vec()));
                }
            }
            contested
        };

        for (at, occupants) in contested {
            let mut living = Vec::with_capacity(occupants.len());
            for id in occupants {
                if !self.is_dead(room_id, id).await {
                    living.push(id);
                }
            }
            living.shuffle(&mut rng);

            for player_id in living {
                if room.grid().tile(at)?.items().is_empty() {
                    break;
                }
                if let Some(taken) = room.pick_up(player_id)? {
                    tracing::debug!(
                        %room_id,
                        %player_id,
                        item_id = %taken.item_id,
                        "item picked up"
                    );
                    cycle.updates.record_item(taken);
                    cycle.updates.record_player(player_id, at, at, Some(taken.item_id));
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Duels and deaths
    // -----------------------------------------------------------------------

    /// Opens barriers for both duelists, registers the duel, and tells each
    /// of them individually. Returns `None` if either was already dead by
    /// the time their previous duel finished.
    async fn start_duel(
        &self,
        room_id: RoomId,
        attacker: PlayerId,
        defender: PlayerId,
    ) -> Result<Option<DuelId>, TurnError> {
        self.gate.await_player(room_id, attacker).await?;
        self.gate.await_player(room_id, defender).await?;
        if self.is_dead(room_id, attacker).await || self.is_dead(room_id, defender).await {
            tracing::debug!(%room_id, %attacker, %defender, "duelist died before duel, skipped");
            return Ok(None);
        }

        self.gate.open_pair(room_id, attacker, defender).await?;
        match self.issue_duel(room_id, attacker, defender).await {
            Ok(duel_id) => Ok(Some(duel_id)),
            Err(err) => {
                let _ = self.gate.close(room_id, attacker).await;
                let _ = self.gate.close(room_id, defender).await;
                tracing::error!(%room_id, %attacker, %defender, error = %err, "duel setup failed");
                Err(err)
            }
        }
    }

    async fn issue_duel(
        &self,
        room_id: RoomId,
        attacker: PlayerId,
        defender: PlayerId,
    ) -> Result<DuelId, TurnError> {
        let kind = *self
            .minigames
            .choose(&mut secure_rng())
            .ok_or(TurnError::NoMinigames)?;
        let duel = self.arbiter.create(room_id, kind, attacker, defender).await?;

        let fight = ServerEvent::Fight(duel.payload());
        let delivered = self
            .hub
            .publish(room_id, attacker, &fight)
            .and_then(|()| self.hub.publish(room_id, defender, &fight));
        if let Err(err) = delivered {
            self.arbiter.discard(room_id, duel.id).await;
            return Err(err.into());
        }
        Ok(duel.id)
    }

    /// Sends every newly dead player to their spawn, dropping their item
    /// where they fell first. Each player is handled once per cycle.
    async fn resolve_deaths(&self, cycle: &mut Cycle) -> Result<(), TurnError> {
        let room_id = cycle.room_id;
        let dead = self.deaths.dead(room_id).await;
        let mut room = cycle.room.lock().await;

        for player_id in dead {
            if !cycle.processed.insert(player_id) {
                continue;
            }
            let player = room.player(player_id)?;
            let (fell_at, team) = (player.position, player.team);

            if let Some(dropped) = room.drop_carried(player_id)? {
                cycle.updates.record_item(dropped);
            }
            let spawn = room.grid().spawn(team);
            room.relocate_player(player_id, spawn)?;
            cycle.updates.record_player(player_id, fell_at, spawn, None);
            tracing::info!(%room_id, %player_id, fell_at = %fell_at, %spawn, "player respawned");
        }
        Ok(())
    }
}
