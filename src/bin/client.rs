//! RPS Arena Client
//!
//! Connects to a server and plays one match from the terminal.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rps_arena::network::client::{connect, ClientConfig, ClientOutcome};

#[derive(Parser, Debug)]
#[command(name = "rps-arena-client")]
#[command(about = "Terminal client for RPS Arena")]
#[command(version)]
struct Args {
    /// Server host or IP (IPv6 literals without brackets)
    server: String,

    /// Server port
    port: u16,

    /// Client identifier
    client_id: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

const BANNER: &str = r"
 ____  ____  ____       _
|  _ \|  _ \/ ___|     / \   _ __ ___ _ __   __ _
| |_) | |_) \___ \    / _ \ | '__/ _ \ '_ \ / _` |
|  _ <|  __/ ___) |  / ___ \| | |  __/ | | | (_| |
|_| \_\_|   |____/  /_/   \_\_|  \___|_| |_|\__,_|
";

async fn play(config: ClientConfig) -> Result<ClientOutcome> {
    let mut client = connect(&config).await?;
    println!("{}", BANNER);

    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();
    Ok(client.play(&mut input, &mut output).await?)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr so they stay out of the game display.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig {
        server_host: args.server,
        server_port: args.port,
        client_id: args.client_id,
    };

    let outcome = play(config).await.inspect_err(|e| error!("{:#}", e))?;
    Ok(match outcome {
        ClientOutcome::Won | ClientOutcome::Lost => ExitCode::SUCCESS,
        ClientOutcome::Aborted(_) => ExitCode::FAILURE,
    })
}
