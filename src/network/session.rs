//! Match Session Management
//!
//! Runs one match between two connected participants from welcome to
//! termination. The session exclusively owns both streams and the
//! authoritative `MatchState`; nothing else touches either.
//!
//! Round cadence:
//!
//! ```text
//! WaitingForMoves ──► Resolving ──► Broadcasting ──┬──► WaitingForMoves
//!        │                                         └──► Finished (winner)
//!        └──► Finished (peer failure)
//! ```

use std::time::Duration;

use futures_util::future;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use crate::core::hash::short_hex;
use crate::game::moves::Move;
use crate::game::round::{end_message, MatchError};
use crate::game::state::{MatchState, PlayerSlot};
use crate::network::protocol::{read_move, ProtocolError, ServerMessage};

/// Unique match identifier (UUID bytes).
pub type MatchId = [u8; 16];

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Blocked until both participants have sent a move.
    WaitingForMoves,
    /// Applying the round to the match state.
    Resolving,
    /// Sending the round result to both participants.
    Broadcasting,
    /// Terminal; both streams are closed.
    Finished,
}

/// Configuration for a match session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Longest wait for a single move. `None` waits forever.
    pub move_timeout: Option<Duration>,
}

/// Session errors. Each names the participant at fault.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Stream closed, failed, or carried an invalid frame.
    #[error("{slot} connection failed: {source}")]
    PeerIo {
        /// Participant whose stream failed.
        slot: PlayerSlot,
        /// Underlying transport error.
        #[source]
        source: ProtocolError,
    },

    /// Participant did not send a move in time.
    #[error("{slot} sent no move within {timeout:?}")]
    MoveTimeout {
        /// Silent participant.
        slot: PlayerSlot,
        /// Configured limit.
        timeout: Duration,
    },
}

impl SessionError {
    /// Participant that caused the failure.
    pub fn culprit(&self) -> PlayerSlot {
        match self {
            SessionError::PeerIo { slot, .. } | SessionError::MoveTimeout { slot, .. } => *slot,
        }
    }

    /// Short reason suitable for an `Aborted` frame.
    pub fn abort_reason(&self) -> String {
        match self {
            SessionError::PeerIo {
                slot,
                source: ProtocolError::InvalidMove(_),
            } => format!("{} sent an invalid move", slot),
            SessionError::PeerIo { slot, .. } => format!("{} disconnected", slot),
            SessionError::MoveTimeout { slot, .. } => format!("{} ran out of time", slot),
        }
    }
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// A player reached zero health.
    Decided {
        /// Surviving player.
        winner: PlayerSlot,
        /// Rounds played.
        rounds: u32,
        /// Health of player 1 and player 2.
        final_health: [i32; 2],
    },
    /// A participant failed before the match was decided.
    Aborted {
        /// Participant at fault.
        culprit: PlayerSlot,
        /// What went wrong.
        error: SessionError,
    },
}

impl SessionOutcome {
    /// Winner, if the match was decided.
    pub fn winner(&self) -> Option<PlayerSlot> {
        match self {
            SessionOutcome::Decided { winner, .. } => Some(*winner),
            SessionOutcome::Aborted { .. } => None,
        }
    }
}

/// Summary of a finished session, logged as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Match id in UUID form.
    pub match_id: String,
    /// Rounds resolved.
    pub rounds: u32,
    /// Winner of a decided match.
    pub winner: Option<PlayerSlot>,
    /// Participant at fault in an aborted match.
    pub aborted_by: Option<PlayerSlot>,
    /// Health of player 1 and player 2.
    pub final_health: [i32; 2],
    /// Hex digest of the final match state.
    pub state_hash: String,
}

/// Welcome frame for a seat.
pub fn welcome_message(slot: PlayerSlot) -> ServerMessage {
    ServerMessage::Welcome {
        slot,
        text: format!("Successfully Connected. Welcome, {}!\n", slot),
    }
}

/// A match session over two participant streams.
pub struct MatchSession<S> {
    /// Unique match identifier.
    id: MatchId,
    /// Current state.
    state: SessionState,
    /// Session configuration.
    config: SessionConfig,
    /// Participant streams, indexed by slot.
    peers: [S; 2],
    /// Participants that already got their welcome.
    welcomed: [bool; 2],
    /// Authoritative game state.
    game: MatchState,
}

impl<S> MatchSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a session. `first` is player 1, `second` is player 2.
    pub fn new(id: MatchId, first: S, second: S, config: SessionConfig) -> Self {
        Self {
            id,
            state: SessionState::WaitingForMoves,
            config,
            peers: [first, second],
            welcomed: [false; 2],
            game: MatchState::new(),
        }
    }

    /// Record that `slot` was welcomed before the session started.
    pub fn mark_welcomed(&mut self, slot: PlayerSlot) {
        self.welcomed[slot.index()] = true;
    }

    /// Match identifier.
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current game state.
    pub fn match_state(&self) -> &MatchState {
        &self.game
    }

    /// Play the match to completion and close both streams.
    #[instrument(skip(self), fields(match_id = %hex::encode(&self.id[..4])))]
    pub async fn run(mut self) -> SessionOutcome {
        info!("Match started");

        let result = self.play().await;
        self.state = SessionState::Finished;

        let outcome = match result {
            Ok(winner) => {
                info!(%winner, rounds = self.game.round, "Match decided");
                SessionOutcome::Decided {
                    winner,
                    rounds: self.game.round,
                    final_health: self.final_health(),
                }
            }
            Err(error) => {
                let culprit = error.culprit();
                warn!(%culprit, %error, "Match aborted");
                let notice = ServerMessage::Aborted {
                    reason: error.abort_reason(),
                };
                if let Err(e) = self.send(culprit.opponent(), &notice).await {
                    debug!(error = %e, "Could not deliver abort notice");
                }
                SessionOutcome::Aborted { culprit, error }
            }
        };

        self.close().await;
        self.log_report(&outcome);
        outcome
    }

    async fn play(&mut self) -> Result<PlayerSlot, SessionError> {
        for slot in PlayerSlot::BOTH {
            if !self.welcomed[slot.index()] {
                self.send(slot, &welcome_message(slot)).await?;
                self.welcomed[slot.index()] = true;
            }
        }

        loop {
            self.state = SessionState::WaitingForMoves;
            let (first, second) = self.await_moves().await?;

            self.state = SessionState::Resolving;
            let report = match self.game.apply_round(first, second) {
                Ok(report) => report,
                Err(MatchError::AlreadyFinished { winner }) => return Ok(winner),
            };
            debug!(
                round = report.round,
                %first,
                %second,
                hash = %short_hex(&self.game.compute_hash()),
                "Round resolved"
            );

            self.state = SessionState::Broadcasting;
            let summary = ServerMessage::RoundSummary {
                text: report.summary(),
            };
            for slot in PlayerSlot::BOTH {
                let sent = self.send_round(slot, &summary).await;
                match (sent, report.match_winner) {
                    (Err(e), None) => return Err(e),
                    // The result stands once the last round is resolved.
                    (Err(e), Some(_)) => debug!(%slot, error = %e, "Could not deliver final round"),
                    (Ok(()), _) => {}
                }
            }

            if let Some(winner) = report.match_winner {
                let end = ServerMessage::MatchEnd {
                    winner,
                    text: end_message(winner),
                };
                for slot in PlayerSlot::BOTH {
                    if let Err(e) = self.send(slot, &end).await {
                        debug!(%slot, error = %e, "Could not deliver match end");
                    }
                }
                return Ok(winner);
            }
        }
    }

    /// Wait for one move from each participant, in whichever order they arrive.
    async fn await_moves(&mut self) -> Result<(Move, Move), SessionError> {
        let timeout = self.config.move_timeout;
        let [first, second] = &mut self.peers;
        future::try_join(
            await_move(first, PlayerSlot::One, timeout),
            await_move(second, PlayerSlot::Two, timeout),
        )
        .await
    }

    async fn send(&mut self, slot: PlayerSlot, message: &ServerMessage) -> Result<(), SessionError> {
        message
            .write_to(&mut self.peers[slot.index()])
            .await
            .map_err(|source| SessionError::PeerIo { slot, source })
    }

    /// Round summary followed by `slot`'s mirrored health.
    async fn send_round(&mut self, slot: PlayerSlot, summary: &ServerMessage) -> Result<(), SessionError> {
        self.send(slot, summary).await?;
        let (own, opponent) = self.game.health_for(slot);
        self.send(slot, &ServerMessage::Health { own, opponent }).await
    }

    async fn close(&mut self) {
        for (peer, slot) in self.peers.iter_mut().zip(PlayerSlot::BOTH) {
            if let Err(e) = peer.shutdown().await {
                debug!(%slot, error = %e, "Stream shutdown failed");
            }
        }
    }

    fn final_health(&self) -> [i32; 2] {
        [
            self.game.player(PlayerSlot::One).health,
            self.game.player(PlayerSlot::Two).health,
        ]
    }

    fn log_report(&self, outcome: &SessionOutcome) {
        let report = MatchReport {
            match_id: uuid::Uuid::from_bytes(self.id).to_string(),
            rounds: self.game.round,
            winner: outcome.winner(),
            aborted_by: match outcome {
                SessionOutcome::Aborted { culprit, .. } => Some(*culprit),
                SessionOutcome::Decided { .. } => None,
            },
            final_health: self.final_health(),
            state_hash: hex::encode(self.game.compute_hash()),
        };
        match serde_json::to_string(&report) {
            Ok(json) => info!(report = %json, "Match report"),
            Err(e) => warn!(error = %e, "Failed to serialize match report"),
        }
    }
}

async fn await_move<S>(
    stream: &mut S,
    slot: PlayerSlot,
    timeout: Option<Duration>,
) -> Result<Move, SessionError>
where
    S: AsyncRead + Unpin,
{
    let read = read_move(stream);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, read)
            .await
            .map_err(|_| SessionError::MoveTimeout { slot, timeout: limit })?,
        None => read.await,
    };
    result.map_err(|source| SessionError::PeerIo { slot, source })
}
