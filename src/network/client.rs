//! Move Client
//!
//! Terminal participant: prompts for a move each round, sends it, and shows
//! the round summary with both health bars until the match ends.

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

use crate::game::moves::Move;
use crate::game::state::PlayerSlot;
use crate::network::protocol::{write_move, ProtocolError, ServerMessage};

const PROMPT: &str = "Enter your choice (Rock [r], Paper [p], Scissors [s]): ";
const REPROMPT: &str = "Invalid input. Please enter 'r', 'p', or 's': ";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name or IP literal (IPv6 without brackets).
    pub server_host: String,
    /// Server port.
    pub server_port: u16,
    /// Local identifier, used only in logs.
    pub client_id: u32,
}

impl ClientConfig {
    /// `host:port` for messages, with IPv6 literals bracketed.
    pub fn display_addr(&self) -> String {
        if self.server_host.contains(':') {
            format!("[{}]:{}", self.server_host, self.server_port)
        } else {
            format!("{}:{}", self.server_host, self.server_port)
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: crate::DEFAULT_PORT,
            client_id: 0,
        }
    }
}

/// How the match ended for this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOutcome {
    /// This client's player survived.
    Won,
    /// The opponent survived.
    Lost,
    /// The server stopped the match early.
    Aborted(String),
}

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Could not reach the server.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// Address that was tried.
        addr: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Connection failed or carried a bad frame.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Terminal output failed.
    #[error("Output error: {0}")]
    Io(#[from] io::Error),

    /// Local input reached end of file.
    #[error("Input closed before the match ended")]
    InputClosed,

    /// Server sent a frame out of order.
    #[error("Unexpected {0} frame")]
    UnexpectedFrame(&'static str),
}

/// Health bar line: one `=` per 10 HP.
pub fn render_health_bar(label: &str, hp: i32) -> String {
    let segments = usize::try_from(hp / 10).unwrap_or(0);
    format!("{} HP: {} ({})", label, "=".repeat(segments), hp)
}

/// Prompt until the user enters a valid move.
pub async fn prompt_move<I, O>(input: &mut I, output: &mut O) -> Result<Move, ClientError>
where
    I: AsyncBufRead + Unpin,
    O: Write,
{
    write!(output, "{}", PROMPT)?;
    output.flush()?;

    let mut line = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line).await? == 0 {
            return Err(ClientError::InputClosed);
        }
        // Bytes that are not UTF-8 are just another invalid choice.
        let parsed = std::str::from_utf8(&line)
            .map_err(|e| e.to_string())
            .and_then(|text| text.parse::<Move>().map_err(|e| e.to_string()));
        match parsed {
            Ok(mv) => return Ok(mv),
            Err(e) => {
                debug!("{}", e);
                write!(output, "{}", REPROMPT)?;
                output.flush()?;
            }
        }
    }
}

/// Connect to the server.
pub async fn connect(config: &ClientConfig) -> Result<MoveClient<TcpStream>, ClientError> {
    let stream = TcpStream::connect((config.server_host.as_str(), config.server_port))
        .await
        .map_err(|source| ClientError::Connect {
            addr: config.display_addr(),
            source,
        })?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY: {}", e);
    }
    info!("Connected to {}", config.display_addr());
    Ok(MoveClient::new(stream, config.client_id))
}

/// A participant connection.
pub struct MoveClient<S> {
    stream: S,
    client_id: u32,
    slot: Option<PlayerSlot>,
}

impl<S> MoveClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established stream.
    pub fn new(stream: S, client_id: u32) -> Self {
        Self {
            stream,
            client_id,
            slot: None,
        }
    }

    /// Seat assigned by the server, once welcomed.
    pub fn slot(&self) -> Option<PlayerSlot> {
        self.slot
    }

    /// Play the match to the end.
    #[instrument(skip_all, fields(client_id = self.client_id))]
    pub async fn play<I, O>(&mut self, input: &mut I, output: &mut O) -> Result<ClientOutcome, ClientError>
    where
        I: AsyncBufRead + Unpin,
        O: Write,
    {
        let slot = match ServerMessage::read_from(&mut self.stream).await? {
            ServerMessage::Welcome { slot, text } => {
                write!(output, "{}\n\n", text)?;
                slot
            }
            ServerMessage::Aborted { reason } => return show_abort(output, reason),
            _ => return Err(ClientError::UnexpectedFrame("pre-welcome")),
        };
        self.slot = Some(slot);
        info!("Seated as {}", slot);

        loop {
            writeln!(output)?;
            let mv = prompt_move(input, output).await?;
            debug!(%mv, "Sending move");

            if let Err(e) = write_move(&mut self.stream, mv).await {
                // The server may already have explained why it closed.
                return match ServerMessage::read_from(&mut self.stream).await {
                    Ok(ServerMessage::Aborted { reason }) => show_abort(output, reason),
                    _ => Err(e.into()),
                };
            }

            if let Some(outcome) = self.read_round(slot, output).await? {
                return Ok(outcome);
            }
        }
    }

    /// Read frames until the round is fully reported.
    async fn read_round<O: Write>(
        &mut self,
        slot: PlayerSlot,
        output: &mut O,
    ) -> Result<Option<ClientOutcome>, ClientError> {
        loop {
            match ServerMessage::read_from(&mut self.stream).await? {
                ServerMessage::RoundSummary { text } => writeln!(output, "{}", text)?,
                ServerMessage::Health { own, opponent } => {
                    writeln!(output, "{}", render_health_bar("Your", own))?;
                    writeln!(output)?;
                    writeln!(output, "{}", render_health_bar("Opponent's", opponent))?;
                    if own > 0 && opponent > 0 {
                        return Ok(None);
                    }
                }
                ServerMessage::MatchEnd { winner, .. } => {
                    let (outcome, line) = if winner == slot {
                        (ClientOutcome::Won, "Congratulations, You win!")
                    } else {
                        (ClientOutcome::Lost, "Game Over, You lose!")
                    };
                    write!(output, "\n{}\n", line)?;
                    info!(%winner, "Match over");
                    return Ok(Some(outcome));
                }
                ServerMessage::Aborted { reason } => return show_abort(output, reason).map(Some),
                ServerMessage::Welcome { .. } => return Err(ClientError::UnexpectedFrame("welcome")),
            }
        }
    }
}

fn show_abort<O: Write>(output: &mut O, reason: String) -> Result<ClientOutcome, ClientError> {
    write!(output, "\nMatch aborted: {}\n", reason)?;
    info!("Match aborted: {}", reason);
    Ok(ClientOutcome::Aborted(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::read_move;
    use crate::network::session::welcome_message;
    use tokio::io::{duplex, DuplexStream};

    fn text(out: &[u8]) -> String {
        String::from_utf8(out.to_vec()).unwrap()
    }

    #[test]
    fn test_render_health_bar() {
        assert_eq!(render_health_bar("Your", 50), "Your HP: ===== (50)");
        assert_eq!(render_health_bar("Your", 100), "Your HP: ========== (100)");
        assert_eq!(render_health_bar("Opponent's", 5), "Opponent's HP:  (5)");
        assert_eq!(render_health_bar("Opponent's", 0), "Opponent's HP:  (0)");
    }

    #[tokio::test]
    async fn test_prompt_reprompts_until_valid() {
        let mut input: &[u8] = b"x\nrock\n  p \n";
        let mut output = Vec::new();

        let mv = prompt_move(&mut input, &mut output).await.unwrap();
        assert_eq!(mv, Move::Paper);

        let shown = text(&output);
        assert!(shown.starts_with(PROMPT));
        assert_eq!(shown.matches(REPROMPT).count(), 2);
    }

    #[tokio::test]
    async fn test_prompt_input_closed() {
        let mut input: &[u8] = b"R\n";
        let mut output = Vec::new();
        let err = prompt_move(&mut input, &mut output).await.unwrap_err();
        assert!(matches!(err, ClientError::InputClosed));
    }

    #[tokio::test]
    async fn test_prompt_rejects_non_utf8_line() {
        let mut input: &[u8] = b"\xff\xfe\n r\n";
        let mut output = Vec::new();

        let mv = prompt_move(&mut input, &mut output).await.unwrap();
        assert_eq!(mv, Move::Rock);
        assert_eq!(text(&output).matches(REPROMPT).count(), 1);
    }

    #[test]
    fn test_display_addr_brackets_ipv6() {
        let mut config = ClientConfig {
            server_host: "::1".to_string(),
            server_port: 8080,
            client_id: 1,
        };
        assert_eq!(config.display_addr(), "[::1]:8080");

        config.server_host = "localhost".to_string();
        assert_eq!(config.display_addr(), "localhost:8080");
    }

    #[tokio::test]
    async fn test_connect_by_host_and_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ClientConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: port,
            client_id: 3,
        };

        let (client, accepted) = tokio::join!(connect(&config), listener.accept());
        assert!(client.is_ok());
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn test_connect_ipv6_host_literal() {
        // Hosts without IPv6 loopback skip this check.
        let Ok(listener) = tokio::net::TcpListener::bind("[::1]:0").await else {
            return;
        };
        let config = ClientConfig {
            server_host: "::1".to_string(),
            server_port: listener.local_addr().unwrap().port(),
            client_id: 4,
        };

        let (client, accepted) = tokio::join!(connect(&config), listener.accept());
        assert!(client.is_ok());
        assert!(accepted.is_ok());
    }

    async fn fake_server(mut stream: DuplexStream, frames: Vec<ServerMessage>) -> Move {
        welcome_message(PlayerSlot::Two).write_to(&mut stream).await.unwrap();
        let mv = read_move(&mut stream).await.unwrap();
        for frame in frames {
            frame.write_to(&mut stream).await.unwrap();
        }
        mv
    }

    #[tokio::test]
    async fn test_play_to_defeat() {
        let (client_side, server_side) = duplex(1024);
        let server = tokio::spawn(fake_server(
            server_side,
            vec![
                ServerMessage::RoundSummary { text: "\nPlayer 1 wins this round!\n".to_string() },
                ServerMessage::Health { own: 0, opponent: 100 },
                ServerMessage::MatchEnd {
                    winner: PlayerSlot::One,
                    text: "Game over, Player 1 Wins!\n".to_string(),
                },
            ],
        ));

        let mut client = MoveClient::new(client_side, 9);
        let mut input: &[u8] = b"s\n";
        let mut output = Vec::new();
        let outcome = client.play(&mut input, &mut output).await.unwrap();

        assert_eq!(outcome, ClientOutcome::Lost);
        assert_eq!(client.slot(), Some(PlayerSlot::Two));
        assert_eq!(server.await.unwrap(), Move::Scissors);

        let shown = text(&output);
        assert!(shown.contains("Welcome, Player 2!"));
        assert!(shown.contains("Player 1 wins this round!"));
        assert!(shown.contains("Your HP:  (0)"));
        assert!(shown.contains("Opponent's HP: ========== (100)"));
        assert!(shown.ends_with("\nGame Over, You lose!\n"));
    }

    #[tokio::test]
    async fn test_play_reports_abort() {
        let (client_side, server_side) = duplex(1024);
        let server = tokio::spawn(fake_server(
            server_side,
            vec![ServerMessage::Aborted { reason: "Player 1 disconnected".to_string() }],
        ));

        let mut client = MoveClient::new(client_side, 1);
        let mut input: &[u8] = b"r\n";
        let mut output = Vec::new();
        let outcome = client.play(&mut input, &mut output).await.unwrap();

        assert_eq!(outcome, ClientOutcome::Aborted("Player 1 disconnected".to_string()));
        assert!(text(&output).contains("Match aborted: Player 1 disconnected"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_server_vanishing_is_an_error() {
        let (client_side, mut server_side) = duplex(1024);
        welcome_message(PlayerSlot::One).write_to(&mut server_side).await.unwrap();
        drop(server_side);

        let mut client = MoveClient::new(client_side, 1);
        let mut input: &[u8] = b"p\n";
        let mut output = Vec::new();
        let err = client.play(&mut input, &mut output).await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
