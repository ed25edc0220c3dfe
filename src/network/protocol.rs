//! Protocol Messages
//!
//! Wire format for client-server communication over a TCP byte stream.
//!
//! Client to server is a single selector byte per round (`r`, `p`, `s`).
//! Server to client is a tagged frame:
//!
//! ```text
//! 0x01 Welcome       u8 slot, text
//! 0x02 RoundSummary  text
//! 0x03 Health        i32 own, i32 opponent
//! 0x04 MatchEnd      u8 winner slot, text
//! 0x05 Aborted       text
//!
//! text = u16 length, then that many UTF-8 bytes (at most MAX_TEXT_LEN)
//! ```
//!
//! All integers are big-endian (network byte order).

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::game::moves::Move;
use crate::game::state::PlayerSlot;

/// Largest text payload in bytes.
pub const MAX_TEXT_LEN: usize = 256;

const TAG_WELCOME: u8 = 0x01;
const TAG_ROUND_SUMMARY: u8 = 0x02;
const TAG_HEALTH: u8 = 0x03;
const TAG_MATCH_END: u8 = 0x04;
const TAG_ABORTED: u8 = 0x05;

// =============================================================================
// ERRORS
// =============================================================================

/// Framing and transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Peer closed the stream.
    #[error("connection closed by peer")]
    Closed,

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Frame tag not recognised.
    #[error("unknown frame tag {0:#04x}")]
    UnknownTag(u8),

    /// Move selector outside `r`, `p`, `s`.
    #[error("invalid move selector {0:#04x}")]
    InvalidMove(u8),

    /// Player number outside 1..=2.
    #[error("invalid player slot {0}")]
    InvalidSlot(u8),

    /// Text payload over [`MAX_TEXT_LEN`].
    #[error("text payload of {0} bytes exceeds the {max} byte limit", max = MAX_TEXT_LEN)]
    TextTooLong(usize),

    /// Text payload is not UTF-8.
    #[error("text payload is not valid UTF-8")]
    InvalidText(#[from] std::string::FromUtf8Error),
}

fn map_read(err: io::Error) -> ProtocolError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ProtocolError::Closed
    } else {
        ProtocolError::Io(err)
    }
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Send one move selector.
pub async fn write_move<W>(writer: &mut W, mv: Move) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(mv.selector()).await?;
    writer.flush().await?;
    Ok(())
}

/// Receive one move selector.
pub async fn read_move<R>(reader: &mut R) -> Result<Move, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let byte = reader.read_u8().await.map_err(map_read)?;
    Move::from_selector(byte).ok_or(ProtocolError::InvalidMove(byte))
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Greeting that tells a participant its seat.
    Welcome {
        /// Seat assigned to the receiver.
        slot: PlayerSlot,
        /// Greeting text.
        text: String,
    },

    /// Outcome of the last round, identical for both participants.
    RoundSummary {
        /// Summary text.
        text: String,
    },

    /// Health after the last round, in receiver-relative order.
    Health {
        /// Receiver's own health.
        own: i32,
        /// Opponent's health.
        opponent: i32,
    },

    /// Match over; one player reached zero health.
    MatchEnd {
        /// Surviving player.
        winner: PlayerSlot,
        /// Announcement text.
        text: String,
    },

    /// Match stopped early because a participant failed.
    Aborted {
        /// Why the match stopped.
        reason: String,
    },
}

impl ServerMessage {
    /// Serialize to a complete frame.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::with_capacity(16);
        match self {
            ServerMessage::Welcome { slot, text } => {
                buf.push(TAG_WELCOME);
                buf.push(slot.number());
                put_text(&mut buf, text)?;
            }
            ServerMessage::RoundSummary { text } => {
                buf.push(TAG_ROUND_SUMMARY);
                put_text(&mut buf, text)?;
            }
            ServerMessage::Health { own, opponent } => {
                buf.push(TAG_HEALTH);
                buf.extend_from_slice(&own.to_be_bytes());
                buf.extend_from_slice(&opponent.to_be_bytes());
            }
            ServerMessage::MatchEnd { winner, text } => {
                buf.push(TAG_MATCH_END);
                buf.push(winner.number());
                put_text(&mut buf, text)?;
            }
            ServerMessage::Aborted { reason } => {
                buf.push(TAG_ABORTED);
                put_text(&mut buf, reason)?;
            }
        }
        Ok(buf)
    }

    /// Write this message as one frame.
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let frame = self.encode()?;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read the next frame.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let tag = reader.read_u8().await.map_err(map_read)?;
        let message = match tag {
            TAG_WELCOME => ServerMessage::Welcome {
                slot: read_slot(reader).await?,
                text: read_text(reader).await?,
            },
            TAG_ROUND_SUMMARY => ServerMessage::RoundSummary {
                text: read_text(reader).await?,
            },
            TAG_HEALTH => ServerMessage::Health {
                own: reader.read_i32().await.map_err(map_read)?,
                opponent: reader.read_i32().await.map_err(map_read)?,
            },
            TAG_MATCH_END => ServerMessage::MatchEnd {
                winner: read_slot(reader).await?,
                text: read_text(reader).await?,
            },
            TAG_ABORTED => ServerMessage::Aborted {
                reason: read_text(reader).await?,
            },
            other => return Err(ProtocolError::UnknownTag(other)),
        };
        Ok(message)
    }
}

fn put_text(buf: &mut Vec<u8>, text: &str) -> Result<(), ProtocolError> {
    let bytes = text.as_bytes();
    if bytes.len() > MAX_TEXT_LEN {
        return Err(ProtocolError::TextTooLong(bytes.len()));
    }
    // MAX_TEXT_LEN fits in a u16.
    let len = bytes.len() as u16;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

async fn read_text<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = usize::from(reader.read_u16().await.map_err(map_read)?);
    if len > MAX_TEXT_LEN {
        return Err(ProtocolError::TextTooLong(len));
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).await.map_err(map_read)?;
    Ok(String::from_utf8(bytes)?)
}

async fn read_slot<R>(reader: &mut R) -> Result<PlayerSlot, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let number = reader.read_u8().await.map_err(map_read)?;
    PlayerSlot::from_number(number).ok_or(ProtocolError::InvalidSlot(number))
}

// =============================================================================
// TESTS
// =============================================================================
