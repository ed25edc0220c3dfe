//! Round Events
//!
//! What happened during a resolved round, in the order it happened.
//! The round summary text and the session logs are both built from these.

use serde::{Deserialize, Serialize};

use crate::game::state::PlayerSlot;

/// Something that happened while resolving a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEvent {
    /// Both players picked the same move; streaks and damage reset.
    Draw,

    /// One player won the round and hit the other.
    RoundWon {
        /// Round winner.
        winner: PlayerSlot,
        /// Health removed from the loser.
        damage_dealt: i32,
        /// Loser's health after the hit.
        loser_health: i32,
    },

    /// A player's damage switched from base to empowered this round.
    DamageEmpowered {
        /// Player whose streak crossed the threshold.
        player: PlayerSlot,
    },

    /// A player reached zero health.
    MatchEnded {
        /// Surviving player.
        winner: PlayerSlot,
        /// Total rounds played.
        rounds: u32,
    },
}

impl RoundEvent {
    /// Line contributed to the round summary text, if any.
    ///
    /// `MatchEnded` has its own frame and does not appear in the summary.
    pub fn summary_line(&self) -> Option<String> {
        match self {
            RoundEvent::Draw => Some("\nThis round is a draw!\n".to_string()),
            RoundEvent::RoundWon { winner, .. } => {
                Some(format!("\n{} wins this round!\n", winner))
            }
            RoundEvent::DamageEmpowered { player } => Some(format!(
                "\nWinstreak, Double damage activated for {}!\n",
                player
            )),
            RoundEvent::MatchEnded { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines() {
        assert_eq!(
            RoundEvent::Draw.summary_line().as_deref(),
            Some("\nThis round is a draw!\n")
        );

        let won = RoundEvent::RoundWon {
            winner: PlayerSlot::Two,
            damage_dealt: 10,
            loser_health: 90,
        };
        assert_eq!(
            won.summary_line().as_deref(),
            Some("\nPlayer 2 wins this round!\n")
        );

        let empowered = RoundEvent::DamageEmpowered { player: PlayerSlot::One };
        assert_eq!(
            empowered.summary_line().as_deref(),
            Some("\nWinstreak, Double damage activated for Player 1!\n")
        );

        let ended = RoundEvent::MatchEnded { winner: PlayerSlot::One, rounds: 10 };
        assert_eq!(ended.summary_line(), None);
    }
}
