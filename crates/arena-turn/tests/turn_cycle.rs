mod common;

use std::sync::Arc;
use std::time::Duration;

use arena_protocol::{
    AttackPayload, AttackTarget, BonusAttackPayload, Coord, ErrorKind, MovePayload, Phase,
    PlayerId, RoomId, ServerEvent, Team,
};
use arena_sync::ActionSnapshot;
use arena_turn::TurnError;
use common::{Engine, Sent, wait_for_duels, wait_for_fights};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const LONG: Duration = Duration::from_secs(2);

async fn room_with_players(
    engine: &Engine,
    width: i32,
    height: i32,
) -> (RoomId, PlayerId, PlayerId) {
    let room_id = engine
        .rooms
        .create_room(width, height, Vec::<String>::new())
        .await
        .unwrap();
    let a = engine.rooms.create_character(room_id, "ash", "fighter", Team::Second).await.unwrap();
    let b = engine.rooms.create_character(room_id, "birch", "ranger", Team::First).await.unwrap();
    engine.gate.initialize(room_id).await;
    (room_id, a, b)
}

fn attack(attacker: PlayerId, defender: PlayerId) -> AttackPayload {
    AttackPayload { attacker_id: attacker, defender: AttackTarget::Player(defender) }
}

fn move_to(player: PlayerId, x: i32, y: i32) -> MovePayload {
    MovePayload { x, y, prev_x: 0, prev_y: 0, player_id: player }
}

fn spawn_cycle(
    engine: &Engine,
    room_id: RoomId,
    actions: ActionSnapshot,
) -> JoinHandle<Result<arena_protocol::UpdateDelta, TurnError>> {
    let processor = Arc::clone(&engine.processor);
    tokio::spawn(async move { processor.process(room_id, actions).await })
}

async fn position(engine: &Engine, room_id: RoomId, player: PlayerId) -> Coord {
    let room = engine.rooms.get(room_id).await.unwrap();
    let room = room.lock().await;
    room.player(player).unwrap().position
}

#[tokio::test]
async fn test_phases_announced_in_order_then_one_update() {
    let engine = Engine::new();
    let (room_id, _, _) = room_with_players(&engine, 6, 6).await;

    engine.processor.process(room_id, ActionSnapshot::default()).await.unwrap();

    let broadcasts = engine.hub.broadcasts();
    let phases: Vec<Phase> = broadcasts
        .iter()
        .filter_map(|e| match e {
            ServerEvent::Phase(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(phases, Phase::ORDER.to_vec());
    assert!(matches!(broadcasts.last(), Some(ServerEvent::Update(delta)) if delta.is_empty()));
    assert_eq!(
        broadcasts.iter().filter(|e| matches!(e, ServerEvent::Update(_))).count(),
        1
    );
}

#[tokio::test]
async fn test_treasure_attack_disperses_without_duel() {
    let engine = Engine::new();
    let (room_id, _, b) = room_with_players(&engine, 5, 5).await;
    let chest = Coord::new(1, 1);
    let (gold, gem) = {
        let room = engine.rooms.get(room_id).await.unwrap();
        let mut room = room.lock().await;
        (room.place_item("gold", chest).unwrap(), room.place_item("gem", chest).unwrap())
    };

    let actions = ActionSnapshot {
        attacks: vec![AttackPayload { attacker_id: b, defender: AttackTarget::Treasure }],
        ..Default::default()
    };
    let delta = engine.processor.process(room_id, actions).await.unwrap();

    let room = engine.rooms.get(room_id).await.unwrap();
    let room = room.lock().await;
    assert!(room.grid().tile(chest).unwrap().items().is_empty());
    for item in [gold, gem] {
        let at = room.item(item).unwrap().position;
        assert_ne!(at, chest);
        assert!(!room.grid().tile(at).unwrap().is_special());
        assert_eq!(delta.item(item).unwrap().previous, chest);
        assert_eq!(delta.item(item).unwrap().position, at);
    }
    assert!(engine.hub.sent().iter().all(|s| !matches!(s, Sent::To(..))));
}

#[tokio::test]
async fn test_duel_loser_drops_item_where_it_fell_then_respawns() {
    let engine = Engine::new();
    let (room_id, a, b) = room_with_players(&engine, 10, 10).await;
    let death_site = Coord::new(3, 3);
    let relic = {
        let room = engine.rooms.get(room_id).await.unwrap();
        let mut room = room.lock().await;
        let relic = room.place_item("relic", Coord::new(5, 5)).unwrap();
        room.relocate_player(b, Coord::new(5, 5)).unwrap();
        room.pick_up(b).unwrap().unwrap();
        room.relocate_player(b, death_site).unwrap();
        relic
    };

    let cycle = spawn_cycle(&engine, room_id, ActionSnapshot {
        attacks: vec![attack(a, b)],
        ..Default::default()
    });

    let to_a = wait_for_fights(&engine.hub, a, 1).await;
    let to_b = wait_for_fights(&engine.hub, b, 1).await;
    assert_eq!(to_a[0].duel_id, to_b[0].duel_id);
    assert_eq!((to_a[0].attacker_id, to_a[0].defender_id), (a, b));
    assert!(!cycle.is_finished());

    engine.settle(room_id, &to_a[0], a).await;
    let delta = timeout(LONG, cycle).await.unwrap().unwrap().unwrap();

    let room = engine.rooms.get(room_id).await.unwrap();
    let room = room.lock().await;
    assert_eq!(room.item(relic).unwrap().position, death_site);
    assert_eq!(room.player(b).unwrap().position, Coord::new(8, 1));
    assert_eq!(room.player(b).unwrap().carried, None);
    assert!(room.grid().tile(death_site).unwrap().items().contains(&relic));

    let change = delta.player(b).unwrap();
    assert_eq!(
        (change.previous, change.position, change.item_id),
        (death_site, Coord::new(8, 1), None)
    );
    assert_eq!(delta.item(relic).unwrap().position, death_site);
    // Resolved duels are gone once the cycle ends.
    assert_eq!(engine.arbiter.duel_count(room_id).await, 0);
}

#[tokio::test]
async fn test_second_attack_of_a_fallen_attacker_is_skipped() {
    let engine = Engine::new();
    let (room_id, a, b) = room_with_players(&engine, 8, 8).await;

    let cycle = spawn_cycle(&engine, room_id, ActionSnapshot {
        attacks: vec![attack(a, b), attack(a, b)],
        ..Default::default()
    });

    let fights = wait_for_fights(&engine.hub, a, 1).await;
    engine.settle(room_id, &fights[0], b).await;
    timeout(LONG, cycle).await.unwrap().unwrap().unwrap();

    assert_eq!(engine.hub.fights_to(a).len(), 1);
    assert_eq!(position(&engine, room_id, a).await, Coord::new(1, 6));
}

#[tokio::test]
async fn test_moves_apply_in_order_and_report_net_change() {
    let engine = Engine::new();
    let (room_id, a, _) = room_with_players(&engine, 8, 8).await;
    let spawn = position(&engine, room_id, a).await;

    let delta = engine
        .processor
        .process(room_id, ActionSnapshot {
            moves: vec![move_to(a, 2, 2), move_to(a, 3, 2)],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(position(&engine, room_id, a).await, Coord::new(3, 2));
    let change = delta.player(a).unwrap();
    assert_eq!((change.previous, change.position), (spawn, Coord::new(3, 2)));
}

#[tokio::test]
async fn test_out_of_bounds_move_aborts_cycle() {
    let engine = Engine::new();
    let (room_id, a, _) = room_with_players(&engine, 6, 6).await;
    let spawn = position(&engine, room_id, a).await;

    let err = engine
        .processor
        .process(room_id, ActionSnapshot {
            moves: vec![move_to(a, 6, 0)],
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(position(&engine, room_id, a).await, spawn);
    assert!(!engine.hub.broadcasts().iter().any(|e| matches!(e, ServerEvent::Update(_))));
}

#[tokio::test]
async fn test_bonus_attack_on_empty_tile_is_void() {
    let engine = Engine::new();
    let (room_id, a, _) = room_with_players(&engine, 6, 6).await;

    let result = timeout(
        LONG,
        engine.processor.process(room_id, ActionSnapshot {
            bonus_attacks: vec![BonusAttackPayload { x: 2, y: 2, attacker_id: a }],
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    assert!(result.is_ok());
    assert!(engine.hub.fights_to(a).is_empty());
}

#[tokio::test]
async fn test_bonus_attack_targets_first_living_enemy() {
    let engine = Engine::new();
    let (room_id, a, b) = room_with_players(&engine, 8, 8).await;
    let target = Coord::new(4, 4);
    {
        let room = engine.rooms.get(room_id).await.unwrap();
        room.lock().await.relocate_player(b, target).unwrap();
    }

    let cycle = spawn_cycle(&engine, room_id, ActionSnapshot {
        bonus_attacks: vec![BonusAttackPayload { x: 4, y: 4, attacker_id: a }],
        ..Default::default()
    });

    let fights = wait_for_fights(&engine.hub, b, 1).await;
    assert_eq!((fights[0].attacker_id, fights[0].defender_id), (a, b));
    engine.settle(room_id, &fights[0], b).await;
    timeout(LONG, cycle).await.unwrap().unwrap().unwrap();

    assert_eq!(position(&engine, room_id, a).await, Coord::new(1, 6));
    assert_eq!(position(&engine, room_id, b).await, target);
}

#[tokio::test]
async fn test_collision_runs_a_tournament_on_shared_tile() {
    let engine = Engine::new();
    let (room_id, a, b) = room_with_players(&engine, 8, 8).await;

    let cycle = spawn_cycle(&engine, room_id, ActionSnapshot {
        moves: vec![move_to(a, 3, 3), move_to(b, 3, 3)],
        ..Default::default()
    });

    let fights = wait_for_fights(&engine.hub, a, 1).await;
    let bout = &fights[0];
    let mut duelists = [bout.attacker_id, bout.defender_id];
    duelists.sort();
    let mut expected = [a, b];
    expected.sort();
    assert_eq!(duelists, expected);
    engine.settle(room_id, bout, a).await;
    timeout(LONG, cycle).await.unwrap().unwrap().unwrap();

    assert_eq!(position(&engine, room_id, a).await, Coord::new(3, 3));
    assert_eq!(position(&engine, room_id, b).await, Coord::new(6, 1));
    assert_eq!(engine.hub.fights_to(a).len(), 1);
}

/// Adds a second pair so each team fields two players.
async fn second_pair(engine: &Engine, room_id: RoomId) -> (PlayerId, PlayerId) {
    let c = engine
        .rooms
        .create_character(room_id, "cedar", "rogue", Team::Second)
        .await
        .unwrap();
    let d = engine
        .rooms
        .create_character(room_id, "dune", "fighter", Team::First)
        .await
        .unwrap();
    (c, d)
}

async fn occupants(engine: &Engine, room_id: RoomId, at: Coord) -> Vec<PlayerId> {
    let room = engine.rooms.get(room_id).await.unwrap();
    let room = room.lock().await;
    room.grid().tile(at).unwrap().occupants().to_vec()
}

#[tokio::test]
async fn test_two_on_two_tournament_switches_sides_until_one_stands() {
    let engine = Engine::new();
    let (room_id, a, b) = room_with_players(&engine, 8, 8).await;
    let (c, d) = second_pair(&engine, room_id).await;
    let arena_tile = Coord::new(3, 3);

    let cycle = spawn_cycle(&engine, room_id, ActionSnapshot {
        moves: [a, b, c, d].into_iter().map(|p| move_to(p, 3, 3)).collect(),
        ..Default::default()
    });

    // Every challenger wins, so the champion's role changes hands each bout.
    let mut settled = 0;
    timeout(LONG, async {
        while !cycle.is_finished() {
            let duels = engine.hub.duels();
            match duels.get(settled) {
                Some(bout) => {
                    engine.settle(room_id, bout, bout.defender_id).await;
                    settled += 1;
                }
                None => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
    })
    .await
    .unwrap();
    timeout(LONG, cycle).await.unwrap().unwrap().unwrap();

    let duels = engine.hub.duels();
    assert_eq!(duels.len(), 3);
    for pair in duels.windows(2) {
        assert_eq!(pair[1].attacker_id, pair[0].defender_id);
    }
    let survivor = duels[2].defender_id;
    assert_eq!(occupants(&engine, room_id, arena_tile).await, vec![survivor]);
    for player in [a, b, c, d].into_iter().filter(|p| *p != survivor) {
        assert_ne!(position(&engine, room_id, player).await, arena_tile);
    }
}

#[tokio::test]
async fn test_champion_lost_alongside_challenger_is_replaced_by_teammate() {
    let engine = Engine::new();
    let (room_id, a, b) = room_with_players(&engine, 8, 8).await;
    let (c, d) = second_pair(&engine, room_id).await;
    let teammate = |p: PlayerId| match p {
        p if p == a => c,
        p if p == c => a,
        p if p == b => d,
        _ => b,
    };

    let cycle = spawn_cycle(&engine, room_id, ActionSnapshot {
        moves: [a, b, c, d].into_iter().map(|p| move_to(p, 3, 3)).collect(),
        ..Default::default()
    });

    // The champion wins but is found dead as well.
    let first = wait_for_duels(&engine.hub, 1).await.remove(0);
    engine.deaths.pronounce(room_id, first.attacker_id).await;
    engine.settle(room_id, &first, first.attacker_id).await;

    let second = wait_for_duels(&engine.hub, 2).await.remove(1);
    assert_eq!(second.attacker_id, teammate(first.attacker_id));
    assert_eq!(second.defender_id, teammate(first.defender_id));
    engine.settle(room_id, &second, second.attacker_id).await;
    timeout(LONG, cycle).await.unwrap().unwrap().unwrap();

    assert_eq!(engine.hub.duels().len(), 2);
    assert_eq!(
        occupants(&engine, room_id, Coord::new(3, 3)).await,
        vec![second.attacker_id]
    );
}

#[tokio::test]
async fn test_contested_items_go_one_per_free_hand() {
    let engine = Engine::new();
    let (room_id, a, _) = room_with_players(&engine, 8, 8).await;
    let (c, _) = second_pair(&engine, room_id).await;
    let e = engine
        .rooms
        .create_character(room_id, "elm", "ranger", Team::Second)
        .await
        .unwrap();
    let spot = Coord::new(2, 5);
    let loot = {
        let room = engine.rooms.get(room_id).await.unwrap();
        let mut room = room.lock().await;
        [room.place_item("rope", spot).unwrap(), room.place_item("map", spot).unwrap()]
    };

    let delta = engine
        .processor
        .process(room_id, ActionSnapshot {
            moves: [a, c, e].into_iter().map(|p| move_to(p, 2, 5)).collect(),
            ..Default::default()
        })
        .await
        .unwrap();

    let room = engine.rooms.get(room_id).await.unwrap();
    let room = room.lock().await;
    assert!(room.grid().tile(spot).unwrap().items().is_empty());
    let mut carried: Vec<_> = [a, c, e]
        .into_iter()
        .filter_map(|p| room.player(p).unwrap().carried)
        .collect();
    carried.sort();
    let mut expected = loot.to_vec();
    expected.sort();
    assert_eq!(carried, expected);
    for item in loot {
        assert_eq!(delta.item(item).unwrap().position, Coord::OFF_BOARD);
    }
    let empty_handed: Vec<_> = [a, c, e]
        .into_iter()
        .filter(|p| room.player(*p).unwrap().carried.is_none())
        .collect();
    assert_eq!(empty_handed.len(), 1);
    assert_eq!(delta.player(empty_handed[0]).unwrap().item_id, None);
}

#[tokio::test]
async fn test_teammates_sharing_a_tile_do_not_fight() {
    let engine = Engine::new();
    let (room_id, a, _) = room_with_players(&engine, 8, 8).await;
    let mate = engine
        .rooms
        .create_character(room_id, "cedar", "rogue", Team::Second)
        .await
        .unwrap();

    timeout(
        LONG,
        engine.processor.process(room_id, ActionSnapshot {
            moves: vec![move_to(a, 2, 2), move_to(mate, 2, 2)],
            ..Default::default()
        }),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(engine.hub.fights_to(a).is_empty());
}

#[tokio::test]
async fn test_player_stepping_onto_item_picks_it_up() {
    let engine = Engine::new();
    let (room_id, a, _) = room_with_players(&engine, 8, 8).await;
    let spot = Coord::new(2, 5);
    let coin = {
        let room = engine.rooms.get(room_id).await.unwrap();
        room.lock().await.place_item("coin", spot).unwrap()
    };

    let delta = engine
        .processor
        .process(room_id, ActionSnapshot {
            moves: vec![move_to(a, 2, 5)],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(delta.player(a).unwrap().item_id, Some(coin));
    assert_eq!(delta.item(coin).unwrap().position, Coord::OFF_BOARD);
    let room = engine.rooms.get(room_id).await.unwrap();
    let room = room.lock().await;
    assert_eq!(room.player(a).unwrap().carried, Some(coin));
    assert!(room.grid().tile(spot).unwrap().items().is_empty());
}

#[tokio::test]
async fn test_only_free_hands_pick_up() {
    let engine = Engine::new();
    let (room_id, a, _) = room_with_players(&engine, 8, 8).await;
    let spot = Coord::new(4, 2);
    let (held, lying) = {
        let room = engine.rooms.get(room_id).await.unwrap();
        let mut room = room.lock().await;
        let held = room.place_item("held", Coord::new(5, 5)).unwrap();
        room.relocate_player(a, Coord::new(5, 5)).unwrap();
        room.pick_up(a).unwrap().unwrap();
        (held, room.place_item("lying", spot).unwrap())
    };

    engine
        .processor
        .process(room_id, ActionSnapshot {
            moves: vec![move_to(a, 4, 2)],
            ..Default::default()
        })
        .await
        .unwrap();

    let room = engine.rooms.get(room_id).await.unwrap();
    let room = room.lock().await;
    assert_eq!(room.player(a).unwrap().carried, Some(held));
    assert_eq!(room.item(lying).unwrap().position, spot);
}

#[tokio::test]
async fn test_unreachable_duelist_aborts_and_leaves_no_barrier() {
    let engine = Engine::new();
    let (room_id, a, b) = room_with_players(&engine, 8, 8).await;
    engine.hub.cut_off(b);

    let err = timeout(
        LONG,
        engine.processor.process(room_id, ActionSnapshot {
            attacks: vec![attack(a, b)],
            ..Default::default()
        }),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Aborted);
    assert_eq!(engine.gate.open_count(room_id).await, 0);
    assert_eq!(engine.arbiter.duel_count(room_id).await, 0);
}

#[tokio::test]
async fn test_unknown_room_is_not_found() {
    let engine = Engine::new();
    let err = engine
        .processor
        .process(RoomId(u64::MAX), ActionSnapshot::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
