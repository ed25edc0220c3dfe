//! Game State Definitions
//!
//! Authoritative per-player and per-match state.
//! Owned exclusively by a single match session; mutated once per round.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::{BASE_DAMAGE, EMPOWERED_DAMAGE, MAX_HEALTH, STREAK_THRESHOLD};

// =============================================================================
// PLAYER SLOT
// =============================================================================

/// Seat of a participant in a match.
///
/// Player 1 is the first connection of a pair, player 2 the second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayerSlot {
    /// First participant.
    One,
    /// Second participant.
    Two,
}

impl PlayerSlot {
    /// Both slots in seat order.
    pub const BOTH: [PlayerSlot; 2] = [PlayerSlot::One, PlayerSlot::Two];

    /// Array index (0 or 1).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    /// Human-facing player number (1 or 2).
    #[inline]
    pub fn number(self) -> u8 {
        match self {
            PlayerSlot::One => 1,
            PlayerSlot::Two => 2,
        }
    }

    /// Slot from a player number.
    pub fn from_number(number: u8) -> Option<PlayerSlot> {
        match number {
            1 => Some(PlayerSlot::One),
            2 => Some(PlayerSlot::Two),
            _ => None,
        }
    }

    /// The other seat.
    #[inline]
    pub fn opponent(self) -> PlayerSlot {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.number())
    }
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// Health, streak and damage of one participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Remaining health, never below zero.
    pub health: i32,

    /// Consecutive rounds won.
    pub win_streak: u32,

    /// Health removed from the opponent on a win.
    pub damage: i32,
}

impl PlayerState {
    /// Fresh player at full health and base damage.
    pub const fn new() -> Self {
        Self {
            health: MAX_HEALTH,
            win_streak: 0,
            damage: BASE_DAMAGE,
        }
    }

    /// Still standing?
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Is the streak bonus active?
    #[inline]
    pub fn is_empowered(&self) -> bool {
        self.damage == EMPOWERED_DAMAGE
    }

    /// Subtract `amount` from health, clamping at zero.
    pub fn take_hit(&mut self, amount: i32) {
        self.health = self.health.saturating_sub(amount).max(0);
    }

    /// Extend the streak and re-arm damage from it.
    ///
    /// Returns true if damage became empowered on this call.
    pub fn record_win(&mut self) -> bool {
        let was_empowered = self.is_empowered();
        self.win_streak += 1;
        self.damage = if self.win_streak >= STREAK_THRESHOLD {
            EMPOWERED_DAMAGE
        } else {
            BASE_DAMAGE
        };
        !was_empowered && self.is_empowered()
    }

    /// Reset streak and damage after a draw or a loss.
    pub fn break_streak(&mut self) {
        self.win_streak = 0;
        self.damage = BASE_DAMAGE;
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_i32(self.health);
        hasher.update_u32(self.win_streak);
        hasher.update_i32(self.damage);
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Lifecycle of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Both players alive; rounds are being played.
    Live,
    /// A player reached zero health.
    Finished {
        /// Surviving player.
        winner: PlayerSlot,
    },
}

/// Complete authoritative state of one match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Rounds resolved so far.
    pub round: u32,

    /// Per-player state, indexed by [`PlayerSlot::index`].
    pub players: [PlayerState; 2],

    /// Current phase.
    pub phase: MatchPhase,
}

impl MatchState {
    /// Create the starting state.
    pub fn new() -> Self {
        Self {
            round: 0,
            players: [PlayerState::new(), PlayerState::new()],
            phase: MatchPhase::Live,
        }
    }

    /// Get a player's state.
    #[inline]
    pub fn player(&self, slot: PlayerSlot) -> &PlayerState {
        &self.players[slot.index()]
    }

    /// Get a player's state mutably.
    #[inline]
    pub fn player_mut(&mut self, slot: PlayerSlot) -> &mut PlayerState {
        &mut self.players[slot.index()]
    }

    /// Are rounds still being played?
    pub fn is_live(&self) -> bool {
        matches!(self.phase, MatchPhase::Live)
    }

    /// Winner, once finished.
    pub fn winner(&self) -> Option<PlayerSlot> {
        match self.phase {
            MatchPhase::Live => None,
            MatchPhase::Finished { winner } => Some(winner),
        }
    }

    /// Health as seen by `slot`: (own, opponent's).
    pub fn health_for(&self, slot: PlayerSlot) -> (i32, i32) {
        (
            self.player(slot).health,
            self.player(slot.opponent()).health,
        )
    }

    /// Finish the match if a player has run out of health.
    pub(crate) fn check_finished(&mut self) -> Option<PlayerSlot> {
        if !self.is_live() {
            return self.winner();
        }
        let fallen = PlayerSlot::BOTH
            .into_iter()
            .find(|slot| !self.player(*slot).is_alive())?;
        let winner = fallen.opponent();
        self.phase = MatchPhase::Finished { winner };
        Some(winner)
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.round, |hasher| {
            match self.phase {
                MatchPhase::Live => hasher.update_u8(0),
                MatchPhase::Finished { winner } => hasher.update_u8(winner.number()),
            }
            for player in &self.players {
                player.hash_into(hasher);
            }
        })
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_helpers() {
        assert_eq!(PlayerSlot::One.opponent(), PlayerSlot::Two);
        assert_eq!(PlayerSlot::Two.opponent(), PlayerSlot::One);
        assert_eq!(PlayerSlot::from_number(2), Some(PlayerSlot::Two));
        assert_eq!(PlayerSlot::from_number(3), None);
        assert_eq!(PlayerSlot::Two.to_string(), "Player 2");
    }

    #[test]
    fn test_initial_state() {
        let state = MatchState::new();
        for slot in PlayerSlot::BOTH {
            let p = state.player(slot);
            assert_eq!(p.health, MAX_HEALTH);
            assert_eq!(p.win_streak, 0);
            assert_eq!(p.damage, BASE_DAMAGE);
        }
        assert!(state.is_live());
        assert_eq!(state.winner(), None);
    }

    #[test]
    fn test_take_hit_clamps_at_zero() {
        let mut p = PlayerState::new();
        p.health = 5;
        p.take_hit(EMPOWERED_DAMAGE);
        assert_eq!(p.health, 0);
        assert!(!p.is_alive());
    }

    #[test]
    fn test_record_win_empowers_at_threshold() {
        let mut p = PlayerState::new();
        assert!(!p.record_win());
        assert!(!p.record_win());
        assert!(p.record_win(), "third win should empower");
        assert_eq!(p.damage, EMPOWERED_DAMAGE);
        assert!(!p.record_win(), "already empowered, no new activation");
        assert_eq!(p.damage, EMPOWERED_DAMAGE);

        p.break_streak();
        assert_eq!(p.win_streak, 0);
        assert_eq!(p.damage, BASE_DAMAGE);
    }

    #[test]
    fn test_health_for_is_mirrored() {
        let mut state = MatchState::new();
        state.player_mut(PlayerSlot::Two).health = 70;
        assert_eq!(state.health_for(PlayerSlot::One), (100, 70));
        assert_eq!(state.health_for(PlayerSlot::Two), (70, 100));
    }

    #[test]
    fn test_check_finished_names_survivor() {
        let mut state = MatchState::new();
        assert_eq!(state.check_finished(), None);

        state.player_mut(PlayerSlot::One).health = 0;
        assert_eq!(state.check_finished(), Some(PlayerSlot::Two));
        assert_eq!(state.phase, MatchPhase::Finished { winner: PlayerSlot::Two });
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let a = MatchState::new();
        let mut b = MatchState::new();
        assert_eq!(a.compute_hash(), b.compute_hash());

        b.player_mut(PlayerSlot::One).win_streak = 1;
        assert_ne!(a.compute_hash(), b.compute_hash());
    }
}
