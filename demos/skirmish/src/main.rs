//! A scripted two-on-two match against the in-process engine.
//!
//! Every player gets a client task that prints its frames as JSON and
//! answers each "Fight" with the outcome both duelists agree on.
//! `RUST_LOG=debug cargo run -p skirmish` shows the engine's own logs.

use std::sync::Arc;

use arena::prelude::*;
use arena::telemetry::init_tracing;
use tokio::sync::mpsc::Receiver;

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

/// Stand-in for a minigame: both sides compute the same winner.
fn agreed_winner(duel: &DuelPayload) -> PlayerId {
    if duel.duel_id.0 % 2 == 0 {
        duel.attacker_id
    } else {
        duel.defender_id
    }
}

async fn run_client(
    arena: Arc<ArenaService>,
    room: RoomId,
    me: PlayerId,
    name: &'static str,
    mut events: Receiver<ServerEvent>,
) {
    while let Some(event) = events.recv().await {
        match JsonCodec.encode(&event) {
            Ok(frame) => println!("[{name}] {}", String::from_utf8_lossy(&frame)),
            Err(err) => tracing::warn!(error = %err, "frame not encodable"),
        }
        if let ServerEvent::Fight(duel) = event {
            let winner = agreed_winner(&duel);
            if let Err(err) = arena.register_duel_result(room, duel.duel_id, me, winner).await {
                tracing::error!(player_id = %me, error = %err, "result rejected");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), ArenaError> {
    let config = ArenaConfig::from_env();
    init_tracing(&config);

    let arena = Arc::new(ArenaService::new(config));
    let room = arena.create_default_room(["lantern", "map", "dagger"]).await?;

    let ash = join(&arena, room, "ash", "fighter", Team::First).await?;
    let birch = join(&arena, room, "birch", "ranger", Team::First).await?;
    let cedar = join(&arena, room, "cedar", "rogue", Team::Second).await?;
    let dogwood = join(&arena, room, "dogwood", "fighter", Team::Second).await?;

    arena.start_game(room).await?;

    // Everyone converges on the middle of the board.
    let middle = Coord::new(arena.config().default_width / 2, arena.config().default_height / 2);
    for player_id in [ash, cedar, dogwood] {
        arena
            .submit_move(room, MovePayload {
                x: middle.x,
                y: middle.y,
                prev_x: -1,
                prev_y: -1,
                player_id,
            })
            .await?;
    }
    arena.submit_skip(room, SkipPayload { player_id: birch }).await?;
    run_cycle(&arena, room).await?;

    // Ranged pressure and a raid on the first team's chest.
    arena
        .submit_bonus_attack(
            room,
            BonusAttackPayload { x: middle.x, y: middle.y, attacker_id: birch },
        )
        .await?;
    arena
        .submit_attack(room, AttackPayload { attacker_id: cedar, defender: AttackTarget::Treasure })
        .await?;
    run_cycle(&arena, room).await?;

    let snapshot = arena.snapshot(room).await?;
    for player in &snapshot.players {
        println!(
            "{} ({}, {}) at {} carrying {:?}",
            player.name, player.class, player.team, player.position, player.carried
        );
    }
    Ok(())
}

async fn join(
    arena: &Arc<ArenaService>,
    room: RoomId,
    name: &'static str,
    class: &str,
    team: Team,
) -> Result<PlayerId, ArenaError> {
    let id = arena.create_character(room, name, class, team).await?;
    let events = arena.connect(room, id).await?;
    tokio::spawn(run_client(Arc::clone(arena), room, id, name, events));
    Ok(id)
}

async fn run_cycle(arena: &ArenaService, room: RoomId) -> Result<(), ArenaError> {
    let cycle = arena.proceed(room).await?;
    if let Err(err) = cycle.await {
        tracing::error!(error = %err, "cycle supervisor failed");
    }
    Ok(())
}
