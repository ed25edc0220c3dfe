//! TCP Game Server
//!
//! Accepts connections, pairs them in arrival order and runs each pair as
//! its own match session task.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::game::state::PlayerSlot;
use crate::network::session::{welcome_message, MatchSession, SessionConfig, SessionOutcome};
use crate::DEFAULT_PORT;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Stop after this many matches have started and finished. `None` serves
    /// until shutdown.
    pub max_matches: Option<usize>,
    /// Settings handed to every session.
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_matches: Some(1),
            session: SessionConfig::default(),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind the listening socket.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Listener stopped accepting connections.
    #[error("Accept failed: {0}")]
    Accept(#[source] io::Error),
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Bound listener.
    listener: TcpListener,
    /// Actual bound address (resolves port 0).
    local_addr: SocketAddr,
    /// Shutdown signal.
    shutdown_tx: watch::Sender<bool>,
}

impl GameServer {
    /// Bind the listening socket.
    pub async fn bind(config: ServerConfig) -> Result<Self, GameServerError> {
        let addr = config.bind_addr;
        let bind_err = |source| GameServerError::Bind { addr, source };

        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            listener,
            local_addr,
            shutdown_tx,
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop until shutdown or the match limit is reached.
    #[instrument(skip(self), fields(addr = %self.local_addr))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        info!("Game server listening on {}", self.local_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut sessions: JoinSet<SessionOutcome> = JoinSet::new();
        let mut waiting: Option<Seated> = None;
        let mut started = 0usize;

        while !self.limit_reached(started) {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, addr) = match result {
                        Ok(conn) => conn,
                        Err(e) if is_transient(&e) => {
                            warn!("Accept error: {}", e);
                            continue;
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                            sessions.shutdown().await;
                            return Err(GameServerError::Accept(e));
                        }
                    };
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }

                    match waiting.take() {
                        None => waiting = seat_first(stream, addr).await,
                        Some(first) => {
                            started += 1;
                            self.start_match(&mut sessions, first.stream, first.addr, stream, addr);
                        }
                    }
                }
                peeked = seated_activity(waiting.as_ref().filter(|seated| seated.watching)) => {
                    match peeked {
                        // Sent its move early; it stays seated and is no longer watched.
                        Ok(n) if n > 0 => {
                            if let Some(seated) = waiting.as_mut() {
                                seated.watching = false;
                            }
                        }
                        _ => {
                            if let Some(seated) = waiting.take() {
                                info!("{} left before an opponent arrived", seated.addr);
                            }
                        }
                    }
                }
                Some(joined) = sessions.join_next() => log_finished(joined),
                _ = wait_for_shutdown(&mut shutdown_rx) => {
                    info!("Shutdown signal received");
                    sessions.shutdown().await;
                    return Ok(());
                }
            }
        }

        info!(matches = started, "Match limit reached, waiting for sessions to finish");
        loop {
            tokio::select! {
                joined = sessions.join_next() => match joined {
                    Some(joined) => log_finished(joined),
                    None => break,
                },
                _ = wait_for_shutdown(&mut shutdown_rx) => {
                    info!("Shutdown signal received");
                    sessions.shutdown().await;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Shutdown the server. Running sessions are cancelled.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    fn limit_reached(&self, started: usize) -> bool {
        self.config.max_matches.is_some_and(|max| started >= max)
    }

    fn start_match(
        &self,
        sessions: &mut JoinSet<SessionOutcome>,
        first: TcpStream,
        first_addr: SocketAddr,
        second: TcpStream,
        second_addr: SocketAddr,
    ) {
        let id = uuid::Uuid::new_v4().into_bytes();
        info!(
            "Match {} paired: {} vs {}",
            hex::encode(&id[..4]),
            first_addr,
            second_addr
        );

        let mut session = MatchSession::new(id, first, second, self.config.session.clone());
        session.mark_welcomed(PlayerSlot::One);
        sessions.spawn(session.run());
    }
}

/// Player 1 waiting for an opponent.
struct Seated {
    stream: TcpStream,
    addr: SocketAddr,
    /// Still checking for a hang-up. Cleared once the player has sent data.
    watching: bool,
}

/// Welcome player 1 right away and hold the stream until an opponent arrives.
async fn seat_first(mut stream: TcpStream, addr: SocketAddr) -> Option<Seated> {
    match welcome_message(PlayerSlot::One).write_to(&mut stream).await {
        Ok(()) => {
            info!("{} connected as {}, waiting for opponent", addr, PlayerSlot::One);
            Some(Seated {
                stream,
                addr,
                watching: true,
            })
        }
        Err(e) => {
            warn!("Dropping {} before pairing: {}", addr, e);
            None
        }
    }
}

/// Resolves when the seated player hangs up (`Ok(0)` or an error) or sends
/// data. Never resolves when nobody is being watched.
async fn seated_activity(seated: Option<&Seated>) -> io::Result<usize> {
    match seated {
        Some(seated) => {
            let mut buf = [0u8; 1];
            seated.stream.peek(&mut buf).await
        }
        None => std::future::pending().await,
    }
}

/// Wait until shutdown is requested. The `watch::Ref` is dropped before
/// returning so callers stay `Send`.
async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

fn log_finished(joined: Result<SessionOutcome, JoinError>) {
    match joined {
        Ok(SessionOutcome::Decided { winner, rounds, .. }) => {
            info!("Session finished: {} won after {} rounds", winner, rounds);
        }
        Ok(SessionOutcome::Aborted { culprit, error }) => {
            info!("Session aborted by {}: {}", culprit, error);
        }
        Err(e) if e.is_cancelled() => debug!("Session cancelled"),
        Err(e) => error!("Session task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::moves::Move;
    use crate::network::protocol::{write_move, ServerMessage};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    fn local_config() -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.max_matches, Some(1));
        assert!(config.session.move_timeout.is_none());
    }

    #[tokio::test]
    async fn test_bind_resolves_port() {
        let server = GameServer::bind(local_config()).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = GameServer::bind(local_config()).await.unwrap();
        let config = ServerConfig {
            bind_addr: first.local_addr(),
            ..Default::default()
        };
        let err = GameServer::bind(config).await.err().unwrap();
        assert!(matches!(err, GameServerError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = Arc::new(GameServer::bind(local_config()).await.unwrap());
        // Signalled before run starts; the loop must still observe it.
        server.shutdown();
        let result = server.run().await;
        assert!(result.is_ok());
    }

    async fn spawn_server(
        config: ServerConfig,
    ) -> (Arc<GameServer>, JoinHandle<Result<(), GameServerError>>) {
        let server = Arc::new(GameServer::bind(config).await.unwrap());
        let handle = tokio::spawn({
            let server = server.clone();
            async move { server.run().await }
        });
        (server, handle)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_on_multi_thread_runtime() {
        let (server, handle) = spawn_server(local_config()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        server.shutdown();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_seated_player_who_leaves_is_replaced() {
        let (server, handle) = spawn_server(local_config()).await;
        let addr = server.local_addr();

        let mut gone = TcpStream::connect(addr).await.unwrap();
        ServerMessage::read_from(&mut gone).await.unwrap();
        drop(gone);
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The newcomer takes the empty seat instead of meeting a dead opponent.
        let mut first = TcpStream::connect(addr).await.unwrap();
        assert_eq!(
            ServerMessage::read_from(&mut first).await.unwrap(),
            welcome_message(PlayerSlot::One)
        );

        let mut second = TcpStream::connect(addr).await.unwrap();
        assert_eq!(
            ServerMessage::read_from(&mut second).await.unwrap(),
            welcome_message(PlayerSlot::Two)
        );

        write_move(&mut first, Move::Rock).await.unwrap();
        write_move(&mut second, Move::Rock).await.unwrap();
        assert!(matches!(
            ServerMessage::read_from(&mut first).await.unwrap(),
            ServerMessage::RoundSummary { .. }
        ));

        server.shutdown();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_early_move_keeps_player_seated() {
        let (server, handle) = spawn_server(local_config()).await;
        let addr = server.local_addr();

        let mut first = TcpStream::connect(addr).await.unwrap();
        ServerMessage::read_from(&mut first).await.unwrap();
        write_move(&mut first, Move::Paper).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut second = TcpStream::connect(addr).await.unwrap();
        assert_eq!(
            ServerMessage::read_from(&mut second).await.unwrap(),
            welcome_message(PlayerSlot::Two)
        );
        write_move(&mut second, Move::Rock).await.unwrap();

        let summary = ServerMessage::read_from(&mut second).await.unwrap();
        assert_eq!(
            summary,
            ServerMessage::RoundSummary {
                text: "\nPlayer 1 wins this round!\n\nPlayer 1 Streak: 1, Player 2 Streak: 0\n"
                    .to_string(),
            }
        );

        server.shutdown();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_first_connection_welcomed_before_pairing() {
        let (server, handle) = spawn_server(local_config()).await;

        let mut first = TcpStream::connect(server.local_addr()).await.unwrap();
        let welcome = ServerMessage::read_from(&mut first).await.unwrap();
        assert_eq!(welcome, welcome_message(PlayerSlot::One));

        server.shutdown();
        assert!(handle.await.unwrap().is_ok());
    }

    #[test]
    fn test_transient_accept_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }
}
