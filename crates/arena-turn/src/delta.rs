//! Accumulates the per-cycle "Update" broadcast.

use std::collections::BTreeMap;

use arena_board::ItemMove;
use arena_protocol::{Coord, ItemChange, ItemId, PlayerChange, PlayerId, UpdateDelta};

/// Collects player and item changes over a cycle, keeping one entry per
/// id. The first record of an id fixes its `previous` position; later
/// records overwrite everything else.
#[derive(Debug, Default)]
pub struct UpdateBuilder {
    players: BTreeMap<PlayerId, PlayerChange>,
    items: BTreeMap<ItemId, ItemChange>,
}

impl UpdateBuilder {
    /// An empty aggregation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a player move. The first call for a player fixes
    /// `previous`; later calls overwrite the position and carried item.
    pub fn record_player(
        &mut self,
        player_id: PlayerId,
        from: Coord,
        to: Coord,
        carried: Option<ItemId>,
    ) {
        self.players
            .entry(player_id)
            .and_modify(|change| {
                change.position = to;
                change.item_id = carried;
            })
            .or_insert(PlayerChange {
                player_id,
                position: to,
                previous: from,
                item_id: carried,
            });
    }

    /// Records an item move. The first recorded origin is kept; the
    /// destination is overwritten.
    pub fn record_item(&mut self, moved: ItemMove) {
        self.items
            .entry(moved.item_id)
            .and_modify(|change| change.position = moved.to)
            .or_insert(ItemChange {
                item_id: moved.item_id,
                position: moved.to,
                previous: moved.from,
            });
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.items.is_empty()
    }

    /// Entries come out in id order.
    pub fn build(self) -> UpdateDelta {
        UpdateDelta {
            player_changes: self.players.into_values().collect(),
            item_changes: self.items.into_values().collect(),
        }
    }
}
