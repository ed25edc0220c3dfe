//! Round Resolution
//!
//! Applies one resolved round to the match: damage, streaks, empowerment
//! and the terminal check. This is the only place `MatchState` changes.

use serde::{Deserialize, Serialize};

use crate::game::events::RoundEvent;
use crate::game::moves::{resolve, Move, RoundOutcome};
use crate::game::state::{MatchState, PlayerSlot};

/// Result of applying a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round number, starting at 1.
    pub round: u32,
    /// Moves of player 1 and player 2.
    pub moves: [Move; 2],
    /// Resolver verdict.
    pub outcome: RoundOutcome,
    /// Events in the order they happened.
    pub events: Vec<RoundEvent>,
    /// Win streaks after the round, indexed by slot.
    pub streaks: [u32; 2],
    /// Health after the round, indexed by slot.
    pub health: [i32; 2],
    /// Set when this round finished the match.
    pub match_winner: Option<PlayerSlot>,
}

impl RoundReport {
    /// Human-readable round summary.
    ///
    /// Built from scratch every call; nothing carries over between rounds.
    pub fn summary(&self) -> String {
        let mut text: String = self
            .events
            .iter()
            .filter_map(RoundEvent::summary_line)
            .collect();
        text.push_str(&format!(
            "\nPlayer 1 Streak: {}, Player 2 Streak: {}\n",
            self.streaks[0], self.streaks[1]
        ));
        text
    }

    /// Player whose damage became empowered this round.
    pub fn empowered(&self) -> Option<PlayerSlot> {
        self.events.iter().find_map(|event| match event {
            RoundEvent::DamageEmpowered { player } => Some(*player),
            _ => None,
        })
    }
}

/// Errors from applying a round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// Rounds cannot be played after a player has fallen.
    #[error("match already finished, {winner} won")]
    AlreadyFinished {
        /// Winner of the finished match.
        winner: PlayerSlot,
    },
}

/// End-of-match announcement naming the winner.
pub fn end_message(winner: PlayerSlot) -> String {
    format!("Game over, {} Wins!\n", winner)
}

/// Resolve a round and apply it to the match.
///
/// Deterministic: the same state and moves always yield the same next state.
/// A finished match is left untouched.
pub fn apply_round(
    state: &mut MatchState,
    first: Move,
    second: Move,
) -> Result<RoundReport, MatchError> {
    if let Some(winner) = state.winner() {
        return Err(MatchError::AlreadyFinished { winner });
    }

    state.round += 1;
    let outcome = resolve(first, second);
    let mut events = Vec::with_capacity(3);

    match outcome.winner() {
        None => {
            for slot in PlayerSlot::BOTH {
                state.player_mut(slot).break_streak();
            }
            events.push(RoundEvent::Draw);
        }
        Some(winner) => {
            let loser = winner.opponent();
            let damage = state.player(winner).damage;

            // Damage is applied with the winner's pre-round damage.
            let target = state.player_mut(loser);
            target.take_hit(damage);
            target.break_streak();
            let loser_health = target.health;

            let empowered = state.player_mut(winner).record_win();

            events.push(RoundEvent::RoundWon {
                winner,
                damage_dealt: damage,
                loser_health,
            });
            if empowered {
                events.push(RoundEvent::DamageEmpowered { player: winner });
            }
        }
    }

    let match_winner = state.check_finished();
    if let Some(winner) = match_winner {
        events.push(RoundEvent::MatchEnded {
            winner,
            rounds: state.round,
        });
    }

    Ok(RoundReport {
        round: state.round,
        moves: [first, second],
        outcome,
        events,
        streaks: [
            state.player(PlayerSlot::One).win_streak,
            state.player(PlayerSlot::Two).win_streak,
        ],
        health: [
            state.player(PlayerSlot::One).health,
            state.player(PlayerSlot::Two).health,
        ],
        match_winner,
    })
}

impl MatchState {
    /// Resolve a round and apply it to this match. See [`apply_round`].
    pub fn apply_round(&mut self, first: Move, second: Move) -> Result<RoundReport, MatchError> {
        apply_round(self, first, second)
    }
}

// =============================================================================
// TESTS
// =============================================================================
