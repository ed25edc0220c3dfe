//! RPS Arena Server
//!
//! Binds a TCP port, pairs incoming players and runs their matches.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rps_arena::{
    network::{GameServer, ServerConfig, SessionConfig},
    DEFAULT_PORT, VERSION,
};

#[derive(Parser, Debug)]
#[command(name = "rps-arena-server")]
#[command(about = "Authoritative rock-paper-scissors combat server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(value_name = "PORT")]
    port_arg: Option<u16>,

    /// Port to listen on (same as the positional argument)
    #[arg(long, conflicts_with = "port_arg")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Matches to host before exiting (0 = unlimited)
    #[arg(long, default_value = "1")]
    matches: usize,

    /// Abort a match when a player takes longer than this to move
    #[arg(long)]
    move_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let port = self.port.or(self.port_arg).unwrap_or(DEFAULT_PORT);
        ServerConfig {
            bind_addr: SocketAddr::new(self.bind, port),
            max_matches: (self.matches > 0).then_some(self.matches),
            session: SessionConfig {
                move_timeout: self.move_timeout_secs.map(Duration::from_secs),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("RPS Arena Server v{}", VERSION);

    let config = args.server_config();
    info!(
        "Matches: {}, move timeout: {:?}",
        config
            .max_matches
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
        config.session.move_timeout
    );

    let server = Arc::new(
        GameServer::bind(config)
            .await
            .context("Failed to start server")?,
    );

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            signal_server.shutdown();
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
