//! Champion/challenger elimination for a crowded tile.
//!
//! The tournament itself is pure bookkeeping: it chooses who fights next
//! and updates the two sides from the outcome. Running the duel and
//! deciding who died is the processor's job.
//!
//! ```text
//!  side A: [a1, a2]          side B: [b1, b2]
//!  champion a3 ──bout──→ challenger drawn from B
//!     challenger falls  → struck from B, a3 defends again
//!     champion falls    → challenger takes over, B becomes the active side
//!     champion dead     → replaced by a draw from its own side
//! ```
//!
//! Every settled bout and every replacement removes exactly one player
//! from the side lists, so a tile with `n` living occupants needs at most
//! `n - 1` bouts.

use arena_protocol::{PlayerId, Team};
use rand::Rng;
use rand::seq::IndexedRandom;

/// The next pairing to fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bout {
    pub champion: PlayerId,
    pub challenger: PlayerId,
}

/// Who left the tile after a bout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoutOutcome {
    ChallengerFell,
    ChampionFell,
}

impl BoutOutcome {
    /// Maps observed deaths to an outcome. Only "champion dead, challenger
    /// alive" counts as the champion falling; both-dead and both-alive are
    /// treated as the challenger losing.
    pub fn from_deaths(champion_dead: bool, challenger_dead: bool) -> Self {
        if champion_dead && !challenger_dead {
            Self::ChampionFell
        } else {
            Self::ChallengerFell
        }
    }

    /// `true` when the deaths did not single out one loser.
    pub fn is_fallback(champion_dead: bool, challenger_dead: bool) -> bool {
        champion_dead == challenger_dead
    }
}

/// Bookkeeping of one tile's elimination.
///
/// Drive it with [`next_bout`](Self::next_bout) and
/// [`settle`](Self::settle) until [`is_over`](Self::is_over). Whenever the
/// champion turns out dead between bouts, swap in a teammate with
/// [`replace_champion`](Self::replace_champion).
#[derive(Debug)]
pub struct Tournament {
    /// Players still waiting to fight, indexed by [`Team::index`]. The
    /// champion is not listed.
    sides: [Vec<PlayerId>; 2],
    champion: PlayerId,
    champion_side: Team,
    challenger: Option<PlayerId>,
}

impl Tournament {
    /// Starts a tournament, or returns `None` if either side is empty.
    ///
    /// The starting side is a fair coin flip and its champion is drawn
    /// uniformly from that side.
    pub fn begin<R: Rng + ?Sized>(
        first: Vec<PlayerId>,
        second: Vec<PlayerId>,
        rng: &mut R,
    ) -> Option<Self> {
        if first.is_empty() || second.is_empty() {
            return None;
        }
        let champion_side = if rng.random_bool(0.5) {
            Team::First
        } else {
            Team::Second
        };
        let mut sides = [first, second];
        let list = &mut sides[champion_side.index()];
        let champion = list.remove(rng.random_range(0..list.len()));

        Some(Self {
            sides,
            champion,
            champion_side,
            challenger: None,
        })
    }

    /// The player currently defending the tile.
    pub fn champion(&self) -> PlayerId {
        self.champion
    }

    pub fn champion_side(&self) -> Team {
        self.champion_side
    }

    /// Players still listed on `team`.
    pub fn remaining(&self, team: Team) -> &[PlayerId] {
        &self.sides[team.index()]
    }

    /// `true` once no challengers are left.
    pub fn is_over(&self) -> bool {
        self.sides[self.champion_side.opponent().index()].is_empty()
    }

    /// Hands the champion's role to a uniformly drawn player of the same
    /// side and returns it. The side does not change.
    ///
    /// Returns `None` if the champion's side has nobody left; the
    /// remaining challengers then stand unopposed.
    pub fn replace_champion<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<PlayerId> {
        let own = &mut self.sides[self.champion_side.index()];
        if own.is_empty() {
            return None;
        }
        self.champion = own.remove(rng.random_range(0..own.len()));
        self.challenger = None;
        Some(self.champion)
    }

    /// Draws the next challenger from the side opposing the champion.
    /// Returns `None` once that side is exhausted.
    pub fn next_bout<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Bout> {
        let challenger = *self.sides[self.champion_side.opponent().index()].choose(rng)?;
        self.challenger = Some(challenger);
        Some(Bout {
            champion: self.champion,
            challenger,
        })
    }

    /// Applies the outcome of the bout last returned by
    /// [`next_bout`](Self::next_bout). The challenger leaves its list in
    /// both cases; if the champion fell, it takes over and the active side
    /// switches.
    pub fn settle(&mut self, outcome: BoutOutcome) {
        let Some(challenger) = self.challenger.take() else {
            return;
        };
        let opponents = &mut self.sides[self.champion_side.opponent().index()];
        opponents.retain(|p| *p != challenger);

        if outcome == BoutOutcome::ChampionFell {
            self.champion = challenger;
            self.champion_side = self.champion_side.opponent();
        }
    }

    /// The champion once no challengers are left.
    pub fn survivor(&self) -> Option<PlayerId> {
        self.is_over().then_some(self.champion)
    }
}
