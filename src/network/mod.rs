//! Network Layer
//!
//! TCP transport for matches. The session owns the authoritative state;
//! all rules live in `game/`.

pub mod protocol;
pub mod session;
pub mod server;
pub mod client;

pub use protocol::{read_move, write_move, ProtocolError, ServerMessage, MAX_TEXT_LEN};
pub use session::{
    welcome_message, MatchId, MatchReport, MatchSession, SessionConfig, SessionError,
    SessionOutcome, SessionState,
};
pub use server::{GameServer, GameServerError, ServerConfig};
pub use client::{ClientConfig, ClientError, ClientOutcome, MoveClient};
