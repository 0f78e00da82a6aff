//! The operations a transport exposes to clients.
//!
//! [`ArenaService`] owns every registry and the turn processor. Request
//! handlers call it concurrently; [`proceed`](ArenaService::proceed) hands
//! a drained action window to a background cycle and returns at once.
//!
//! # Lifecycle
//!
//! ```text
//! create_room ─→ create_character ─→ connect ─→ start_game
//!                                                   │
//!        ┌──────────────────────────────────────────┘
//!        ▼
//!   submit_* ...  ─→ proceed ─→ (cycle runs; duels park it)
//!        ▲                          │
//!        │   register_duel_result ──┘ resumes the parked cycle
//!        └───────── next window ────┘
//! ```
//!
//! Every operation is addressed by [`RoomId`]; rooms never share locks, so
//! cycles of different rooms run side by side.

use std::sync::Arc;

use arena_board::{RoomRegistry, RoomSnapshot};
use arena_protocol::{
    AttackPayload, BonusAttackPayload, DuelId, GameStart, MovePayload, PlayerConnected, PlayerId,
    RoomId, ServerEvent, SkipPayload, Team,
};
use arena_sync::{ActionBuffer, DeathRegistry, DuelArbiter, Resolution, SyncGate};
use arena_turn::{Hub, TurnProcessor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{ArenaConfig, ArenaError, ChannelHub};

/// The engine facade.
///
/// One service hosts any number of rooms. It is cheap to share behind an
/// `Arc`; every method takes `&self`.
///
/// `H` is the outbound publisher. The default [`ChannelHub`] keeps
/// subscribers in memory; a transport may supply its own [`Hub`] through
/// [`with_hub`](Self::with_hub).
pub struct ArenaService<H: Hub = ChannelHub> {
    config: ArenaConfig,
    rooms: Arc<RoomRegistry>,
    buffer: Arc<ActionBuffer>,
    gate: Arc<SyncGate>,
    arbiter: Arc<DuelArbiter>,
    deaths: Arc<DeathRegistry>,
    hub: Arc<H>,
    processor: Arc<TurnProcessor<H>>,
}

impl ArenaService<ChannelHub> {
    /// A service publishing through an in-memory [`ChannelHub`].
    pub fn new(config: ArenaConfig) -> Self {
        let hub = Arc::new(ChannelHub::new(config.subscriber_buffer));
        Self::with_hub(config, hub)
    }

    /// Subscribes a character to its room's events and tells everyone in
    /// the room, the newcomer included, that it has connected.
    ///
    /// A second call for the same player replaces the earlier
    /// subscription.
    ///
    /// # Errors
    /// [`ErrorKind::NotFound`](arena_protocol::ErrorKind::NotFound) if the
    /// room or the character does not exist. Nothing is subscribed then.
    pub async fn connect(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<mpsc::Receiver<ServerEvent>, ArenaError> {
        let name = self.player_name(room_id, player_id).await?;
        let events = self.hub.subscribe(room_id, player_id);
        self.announce_connected(room_id, player_id, name);
        Ok(events)
    }
}

impl<H: Hub> ArenaService<H> {
    /// Builds a service that publishes through `hub`. The configuration is
    /// clamped with [`ArenaConfig::validated`] first.
    pub fn with_hub(config: ArenaConfig, hub: Arc<H>) -> Self {
        let config = config.validated();
        let rooms = Arc::new(RoomRegistry::new());
        let gate = Arc::new(SyncGate::new());
        let arbiter = Arc::new(DuelArbiter::new());
        let deaths = Arc::new(DeathRegistry::new());
        let processor = Arc::new(TurnProcessor::new(
            Arc::clone(&rooms),
            Arc::clone(&arbiter),
            Arc::clone(&deaths),
            Arc::clone(&gate),
            Arc::clone(&hub),
            config.minigames.clone(),
        ));
        Self {
            config,
            rooms,
            buffer: Arc::new(ActionBuffer::new()),
            gate,
            arbiter,
            deaths,
            hub,
            processor,
        }
    }

    /// The configuration in effect after validation.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The publisher every event goes through.
    pub fn hub(&self) -> &Arc<H> {
        &self.hub
    }

    // -----------------------------------------------------------------------
    // Rooms and characters
    // -----------------------------------------------------------------------

    /// Creates a `width`×`height` room with one item per name scattered on
    /// plain tiles.
    pub async fn create_room<S: Into<String>>(
        &self,
        width: i32,
        height: i32,
        item_names: impl IntoIterator<Item = S>,
    ) -> Result<RoomId, ArenaError> {
        Ok(self.rooms.create_room(width, height, item_names).await?)
    }

    /// Like [`create_room`](Self::create_room) with the configured size.
    pub async fn create_default_room<S: Into<String>>(
        &self,
        item_names: impl IntoIterator<Item = S>,
    ) -> Result<RoomId, ArenaError> {
        self.create_room(self.config.default_width, self.config.default_height, item_names)
            .await
    }

    /// Adds a character on its team's spawn tile. `class` is one of
    /// `fighter`, `ranger`, or `rogue`, in any case.
    pub async fn create_character(
        &self,
        room_id: RoomId,
        name: &str,
        class: &str,
        team: Team,
    ) -> Result<PlayerId, ArenaError> {
        Ok(self.rooms.create_character(room_id, name, class, team).await?)
    }

    async fn player_name(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<String, ArenaError> {
        let room = self.rooms.get(room_id).await?;
        let room = room.lock().await;
        Ok(room.player(player_id)?.name.clone())
    }

    fn announce_connected(&self, room_id: RoomId, player_id: PlayerId, name: String) {
        tracing::info!(%room_id, %player_id, %name, "player connected");
        self.hub.publish_to_all(
            room_id,
            &ServerEvent::PlayerConnected(PlayerConnected { id: player_id, name }),
        );
    }

    /// A serializable copy of the room's board, players, and items.
    pub async fn snapshot(&self, room_id: RoomId) -> Result<RoomSnapshot, ArenaError> {
        let room = self.rooms.get(room_id).await?;
        let snapshot = room.lock().await.snapshot();
        Ok(snapshot)
    }

    // -----------------------------------------------------------------------
    // Action window
    // -----------------------------------------------------------------------

    /// Opens the first action window. Safe to call more than once.
    pub async fn start_game(&self, room_id: RoomId) -> Result<(), ArenaError> {
        let room = self.rooms.get(room_id).await?;
        let (width, height) = {
            let room = room.lock().await;
            (room.grid().width(), room.grid().height())
        };
        self.buffer.start_game(room_id).await;
        self.gate.initialize(room_id).await;
        self.hub.publish_to_all(
            room_id,
            &ServerEvent::GameStart(GameStart { room_id, width, height }),
        );
        tracing::info!(%room_id, "game started");
        Ok(())
    }

    /// Queues an attack on a player or on the enemy treasure for the next
    /// cycle and broadcasts "PlayerReady".
    ///
    /// # Errors
    /// [`ErrorKind::NotFound`](arena_protocol::ErrorKind::NotFound) before
    /// [`start_game`](Self::start_game).
    pub async fn submit_attack(
        &self,
        room_id: RoomId,
        attack: AttackPayload,
    ) -> Result<(), ArenaError> {
        let player_id = attack.attacker_id;
        self.buffer.submit_attack(room_id, attack).await?;
        self.ready(room_id, player_id);
        Ok(())
    }

    /// Queues a move. Moves apply in submission order.
    pub async fn submit_move(&self, room_id: RoomId, mv: MovePayload) -> Result<(), ArenaError> {
        let player_id = mv.player_id;
        self.buffer.submit_move(room_id, mv).await?;
        self.ready(room_id, player_id);
        Ok(())
    }

    /// Queues a bonus attack on whatever enemy stands on the target tile
    /// once moves have applied.
    pub async fn submit_bonus_attack(
        &self,
        room_id: RoomId,
        attack: BonusAttackPayload,
    ) -> Result<(), ArenaError> {
        let player_id = attack.attacker_id;
        self.buffer.submit_bonus_attack(room_id, attack).await?;
        self.ready(room_id, player_id);
        Ok(())
    }

    /// Accepts a pass. Nothing is queued; other clients just learn the
    /// player is done for this window.
    pub async fn submit_skip(&self, room_id: RoomId, skip: SkipPayload) -> Result<(), ArenaError> {
        self.buffer.peek(room_id).await?;
        self.ready(room_id, skip.player_id);
        Ok(())
    }

    fn ready(&self, room_id: RoomId, player_id: PlayerId) {
        tracing::debug!(%room_id, %player_id, "submission accepted");
        self.hub.publish_to_all(room_id, &ServerEvent::PlayerReady(player_id));
    }

    // -----------------------------------------------------------------------
    // Duels
    // -----------------------------------------------------------------------

    /// Records one duelist's report.
    ///
    /// When this report resolves the duel, the loser is pronounced dead,
    /// both duelists' barriers are closed so the cycle resumes, and both
    /// receive a "FightResult". The death is recorded before the barriers
    /// open, so the woken cycle always sees it.
    pub async fn register_duel_result(
        &self,
        room_id: RoomId,
        duel_id: DuelId,
        submitter: PlayerId,
        winner: PlayerId,
    ) -> Result<Resolution, ArenaError> {
        let resolution = self
            .arbiter
            .register_result(room_id, duel_id, submitter, winner)
            .await?;
        if !resolution.ready {
            return Ok(resolution);
        }

        let duel = &resolution.duel;
        if let Some(loser) = duel.loser() {
            self.deaths.pronounce(room_id, loser).await;
        }
        for player_id in [duel.attacker, duel.defender] {
            // Already gone if a forced release got there first.
            if let Err(err) = self.gate.close(room_id, player_id).await {
                tracing::warn!(
                    %room_id, %duel_id, %player_id, error = %err,
                    "barrier already released"
                );
            }
        }

        let result = ServerEvent::FightResult(duel.payload());
        for player_id in [duel.attacker, duel.defender] {
            if let Err(err) = self.hub.publish(room_id, player_id, &result) {
                tracing::warn!(
                    %room_id, %duel_id, %player_id, error = %err,
                    "fight result not delivered"
                );
            }
        }
        Ok(resolution)
    }

    // -----------------------------------------------------------------------
    // Cycles
    // -----------------------------------------------------------------------

    /// Closes the action window and starts a resolution cycle in the
    /// background.
    ///
    /// The window's actions are drained atomically and any barrier left
    /// open by an earlier cycle is released first, together with the duels
    /// that were waiting on it. The returned handle completes once the
    /// cycle has finished, failed, or panicked; a failed cycle never leaves
    /// a barrier or an unresolved duel behind.
    ///
    /// Only one cycle per room may be in flight; callers sequence
    /// `proceed` calls.
    ///
    /// # Errors
    /// [`ErrorKind::NotFound`](arena_protocol::ErrorKind::NotFound) before
    /// [`start_game`](Self::start_game).
    pub async fn proceed(&self, room_id: RoomId) -> Result<JoinHandle<()>, ArenaError> {
        let actions = self.buffer.take(room_id).await?;
        self.gate.initialize(room_id).await;
        let released = release_room(&self.gate, &self.arbiter, room_id).await?;
        if released > 0 {
            tracing::warn!(%room_id, released, "released barriers left by previous cycle");
        }

        let processor = Arc::clone(&self.processor);
        let cycle = tokio::spawn(async move { processor.process(room_id, actions).await });

        let gate = Arc::clone(&self.gate);
        let arbiter = Arc::clone(&self.arbiter);
        Ok(tokio::spawn(async move {
            let failed = match cycle.await {
                Ok(Ok(_)) => false,
                Ok(Err(_)) => true,
                Err(err) => {
                    tracing::error!(%room_id, error = %err, "cycle panicked");
                    true
                }
            };
            if failed {
                match release_room(&gate, &arbiter, room_id).await {
                    Ok(released) => {
                        tracing::warn!(%room_id, released, "barriers released after failed cycle")
                    }
                    Err(err) => {
                        tracing::error!(%room_id, error = %err, "could not release barriers")
                    }
                }
            }
        }))
    }

    /// Whether the cycle is parked on the given player's duel.
    ///
    /// `false` for unknown rooms and players.
    pub async fn is_awaiting(&self, room_id: RoomId, player_id: PlayerId) -> bool {
        self.gate.is_open(room_id, player_id).await
    }
}

/// Force-closes every barrier of the room and drops the duels they were
/// guarding. Returns how many barriers were released.
async fn release_room(
    gate: &SyncGate,
    arbiter: &DuelArbiter,
    room_id: RoomId,
) -> Result<usize, ArenaError> {
    let released = gate.force_close_all(room_id).await?;
    arbiter.clear(room_id).await;
    Ok(released)
}
