//! Outbound events: what the engine tells clients.
//!
//! Each [`ServerEvent`] has a stable event-type name ("Phase", "Update",
//! "Fight", ...) that the transport uses as its message type, and a body
//! that is serialized by a [`Codec`](crate::Codec).

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::{Coord, DuelId, ItemId, PlayerId, RoomId};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// The stages of one resolution cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Attack,
    Move,
    BonusAttack,
    CollisionResolution,
}

impl Phase {
    pub const ORDER: [Phase; 4] = [
        Phase::Attack,
        Phase::Move,
        Phase::BonusAttack,
        Phase::CollisionResolution,
    ];

    /// The name broadcast in the "Phase" event.
    pub fn name(self) -> &'static str {
        match self {
            Self::Attack => "Attack",
            Self::Move => "Move",
            Self::BonusAttack => "BonusAttack",
            Self::CollisionResolution => "CollisionResolution",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Minigames
// ---------------------------------------------------------------------------

/// The external minigame that decides a duel. Only the outcome matters
/// to the engine; the kind is forwarded to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MinigameKind {
    EvenOrOdd,
    BiggerDice,
    GuessNumber,
    RockPaperScissors,
    Station1,
    Station2,
    Station3,
}

impl MinigameKind {
    /// The full fixed catalog.
    pub const CATALOG: [MinigameKind; 7] = [
        MinigameKind::EvenOrOdd,
        MinigameKind::BiggerDice,
        MinigameKind::GuessNumber,
        MinigameKind::RockPaperScissors,
        MinigameKind::Station1,
        MinigameKind::Station2,
        MinigameKind::Station3,
    ];
}

// ---------------------------------------------------------------------------
// Duels
// ---------------------------------------------------------------------------

/// Body of the "Fight" and "FightResult" events.
///
/// `winner_id` is absent until the duel has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelPayload {
    pub duel_id: DuelId,
    pub kind: MinigameKind,
    pub attacker_id: PlayerId,
    pub defender_id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<PlayerId>,
}

// ---------------------------------------------------------------------------
// Board deltas
// ---------------------------------------------------------------------------

/// Net change of one player over a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerChange {
    pub player_id: PlayerId,
    pub position: Coord,
    pub previous: Coord,
    /// The item carried at the end of the cycle, if any.
    pub item_id: Option<ItemId>,
}

/// Net change of one item over a cycle. A carried item reports
/// [`Coord::OFF_BOARD`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChange {
    pub item_id: ItemId,
    pub position: Coord,
    pub previous: Coord,
}

/// Body of the "Update" event: one entry per touched player / item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDelta {
    pub player_changes: Vec<PlayerChange>,
    pub item_changes: Vec<ItemChange>,
}

impl UpdateDelta {
    /// `true` if the cycle changed nothing.
    pub fn is_empty(&self) -> bool {
        self.player_changes.is_empty() && self.item_changes.is_empty()
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerChange> {
        self.player_changes.iter().find(|c| c.player_id == id)
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemChange> {
        self.item_changes.iter().find(|c| c.item_id == id)
    }
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Body of the "GameStart" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStart {
    pub room_id: RoomId,
    pub width: i32,
    pub height: i32,
}

/// Body of the "PlayerConnected" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConnected {
    pub id: PlayerId,
    pub name: String,
}

/// Everything the engine emits.
///
/// Adjacently tagged so the JSON frame is
/// `{ "type": "Phase", "data": "Attack" }`, mirroring the transport's
/// `(eventType, payload)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    /// Broadcast before each phase starts.
    Phase(Phase),
    /// Broadcast once at the end of a cycle.
    Update(UpdateDelta),
    /// Unicast to each duelist when a duel opens.
    Fight(DuelPayload),
    /// Unicast to each duelist once both results are in.
    FightResult(DuelPayload),
    /// Broadcast when the first action window opens.
    GameStart(GameStart),
    /// Broadcast whenever a player's submission is accepted.
    PlayerReady(PlayerId),
    /// Broadcast when a player joins the room's event stream.
    PlayerConnected(PlayerConnected),
}

impl ServerEvent {
    /// The transport-level event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Phase(_) => "Phase",
            Self::Update(_) => "Update",
            Self::Fight(_) => "Fight",
            Self::FightResult(_) => "FightResult",
            Self::GameStart(_) => "GameStart",
            Self::PlayerReady(_) => "PlayerReady",
            Self::PlayerConnected(_) => "PlayerConnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names_follow_pipeline_order() {
        let names: Vec<_> = Phase::ORDER.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            ["Attack", "Move", "BonusAttack", "CollisionResolution"]
        );
    }

    #[test]
    fn test_server_event_is_adjacently_tagged() {
        let json = serde_json::to_value(ServerEvent::Phase(Phase::Move)).unwrap();
        assert_eq!(json["type"], "Phase");
        assert_eq!(json["data"], "Move");
    }

    #[test]
    fn test_event_type_matches_tag() {
        let event = ServerEvent::PlayerReady(PlayerId(1));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
    }

    #[test]
    fn test_player_connected_carries_id_and_name() {
        let event = ServerEvent::PlayerConnected(PlayerConnected {
            id: PlayerId(4),
            name: "ash".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PlayerConnected");
        assert_eq!(json["data"]["id"], 4);
        assert_eq!(json["data"]["name"], "ash");
    }

    #[test]
    fn test_unresolved_duel_omits_winner() {
        let payload = DuelPayload {
            duel_id: DuelId(1),
            kind: MinigameKind::BiggerDice,
            attacker_id: PlayerId(1),
            defender_id: PlayerId(2),
            winner_id: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("winner_id").is_none());
        assert_eq!(json["kind"], "BiggerDice");
    }

    #[test]
    fn test_update_delta_lookup() {
        let delta = UpdateDelta {
            player_changes: vec![PlayerChange {
                player_id: PlayerId(3),
                position: Coord::new(1, 1),
                previous: Coord::new(2, 2),
                item_id: None,
            }],
            item_changes: vec![],
        };
        assert!(!delta.is_empty());
        assert_eq!(delta.player(PlayerId(3)).unwrap().position, Coord::new(1, 1));
        assert!(delta.item(ItemId(3)).is_none());
    }
}
