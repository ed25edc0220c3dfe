//! # RPS Arena
//!
//! Authoritative two-player rock-paper-scissors combat over TCP.
//! Each round both players pick a move; the winner hits the loser, and a
//! streak of wins doubles the damage until it breaks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         RPS ARENA                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Match rules (pure, deterministic)         │
//! │  ├── moves.rs    - Moves and round resolution                │
//! │  ├── state.rs    - Match and player state                    │
//! │  ├── round.rs    - Damage and streak state machine           │
//! │  └── events.rs   - Round events and summary lines            │
//! │                                                              │
//! │  network/        - Networking (I/O)                          │
//! │  ├── protocol.rs - Wire frames                               │
//! │  ├── session.rs  - Match session state machine               │
//! │  ├── server.rs   - Accept loop and pairing                   │
//! │  └── client.rs   - Terminal move client                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! `core/` and `game/` do no I/O and read no clocks. The same match state
//! and the same pair of moves always produce the same next state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::moves::{resolve, Move, RoundOutcome};
pub use game::round::{apply_round, RoundReport};
pub use game::state::{MatchState, PlayerSlot, PlayerState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Starting health of each player
pub const MAX_HEALTH: i32 = 100;

/// Damage dealt by a round win
pub const BASE_DAMAGE: i32 = 10;

/// Damage dealt while on a win streak
pub const EMPOWERED_DAMAGE: i32 = 20;

/// Consecutive wins needed for empowered damage
pub const STREAK_THRESHOLD: u32 = 3;
