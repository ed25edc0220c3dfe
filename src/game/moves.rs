//! Moves and Round Resolution
//!
//! The three legal moves and the pure resolver that compares them.
//! Resolution is total over the 3x3 move pairs and has no error path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::state::PlayerSlot;

// =============================================================================
// MOVE
// =============================================================================

/// A move submitted by one player for one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    /// Beats scissors.
    Rock,
    /// Beats rock.
    Paper,
    /// Beats paper.
    Scissors,
}

impl Move {
    /// All moves, in selector order.
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Decode a wire selector byte (`r`, `p`, `s`).
    pub fn from_selector(byte: u8) -> Option<Move> {
        match byte {
            b'r' => Some(Move::Rock),
            b'p' => Some(Move::Paper),
            b's' => Some(Move::Scissors),
            _ => None,
        }
    }

    /// Wire selector byte for this move.
    pub fn selector(self) -> u8 {
        match self {
            Move::Rock => b'r',
            Move::Paper => b'p',
            Move::Scissors => b's',
        }
    }

    /// Check if this move beats `other`.
    #[inline]
    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Scissors, Move::Paper)
                | (Move::Paper, Move::Rock)
        )
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissors",
        };
        f.write_str(name)
    }
}

/// Local move entry that is not one of the three selectors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid move {0:?}, expected 'r', 'p' or 's'")]
pub struct MoveParseError(pub String);

impl FromStr for Move {
    type Err = MoveParseError;

    /// Parse a line of local input. Only a lone lowercase selector is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.as_bytes() {
            [byte] => Move::from_selector(*byte).ok_or_else(|| MoveParseError(trimmed.to_string())),
            _ => Err(MoveParseError(trimmed.to_string())),
        }
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of a round from the match's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// Both players picked the same move.
    Draw,
    /// Player 1 won the round.
    FirstWins,
    /// Player 2 won the round.
    SecondWins,
}

impl RoundOutcome {
    /// Winning slot, if the round was decisive.
    pub fn winner(self) -> Option<PlayerSlot> {
        match self {
            RoundOutcome::Draw => None,
            RoundOutcome::FirstWins => Some(PlayerSlot::One),
            RoundOutcome::SecondWins => Some(PlayerSlot::Two),
        }
    }

    /// Outcome as seen by one player.
    pub fn for_player(self, slot: PlayerSlot) -> Outcome {
        match self.winner() {
            None => Outcome::Draw,
            Some(winner) if winner == slot => Outcome::Win,
            Some(_) => Outcome::Lose,
        }
    }

    /// The same round with the player roles swapped.
    pub fn swapped(self) -> RoundOutcome {
        match self {
            RoundOutcome::Draw => RoundOutcome::Draw,
            RoundOutcome::FirstWins => RoundOutcome::SecondWins,
            RoundOutcome::SecondWins => RoundOutcome::FirstWins,
        }
    }
}

/// Result of a round for a single player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Nobody scored.
    Draw,
    /// This player won.
    Win,
    /// This player lost.
    Lose,
}

/// Resolve one round.
///
/// Equal moves draw; otherwise whoever holds the beating move wins.
pub fn resolve(first: Move, second: Move) -> RoundOutcome {
    if first == second {
        RoundOutcome::Draw
    } else if first.beats(second) {
        RoundOutcome::FirstWins
    } else {
        RoundOutcome::SecondWins
    }
}

// =============================================================================
// TESTS
// =============================================================================
