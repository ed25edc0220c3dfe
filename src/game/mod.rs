//! Game Logic Module
//!
//! All match rules. Pure and deterministic; no I/O.
//!
//! ## Module Structure
//!
//! - `moves`: Moves and the round resolver
//! - `state`: Match state and player state
//! - `round`: Damage and streak state machine applied per round
//! - `events`: Round events for summaries and logging

pub mod moves;
pub mod state;
pub mod round;
pub mod events;

// Re-export key types
pub use moves::{resolve, Move, MoveParseError, Outcome, RoundOutcome};
pub use state::{MatchState, PlayerState, PlayerSlot, MatchPhase};
pub use round::{apply_round, end_message, MatchError, RoundReport};
pub use events::RoundEvent;
