//! Chatingo: line-based TCP chat, server and client in one binary.
//!
//! # Usage
//!
//! ```text
//! chatingo [OPTIONS]
//!
//! Options:
//!   --mode   <MODE>  server or client [default: client]
//!   --host   <HOST>  Address to bind (server) or connect to (client) [default: 127.0.0.1]
//!   --port   <PORT>  TCP port [default: 3500]
//!   --config <PATH>  Server TOML configuration file
//!   --max-username-length <N>  Longest accepted display name [default: 20]
//! ```
//!
//! Any other `--mode` value prints the usage line and exits successfully.
//!
//! # Environment variable overrides
//!
//! | Variable          | Default     | Description                 |
//! |-------------------|-------------|-----------------------------|
//! | `CHATINGO_MODE`   | `client`    | `server` or `client`        |
//! | `CHATINGO_HOST`   | `127.0.0.1` | Bind / connect address      |
//! | `CHATINGO_PORT`   | `3500`      | TCP port                    |
//! | `CHATINGO_CONFIG` | (none)      | Server configuration file   |
//! | `CHATINGO_MAX_USERNAME_LENGTH` | `20` | Longest display name |
//!
//! `--host` and `--port` take precedence over the `[network]` section of the
//! configuration file, and `--max-username-length` over
//! `chat.max_username_length`.  The client checks names locally against its
//! own `--max-username-length`; when the server runs with a different limit,
//! pass the same value to both so the client's "Max length" hint matches.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chatingo_client::ClientError;
use chatingo_core::MAX_USERNAME_LENGTH;
use chatingo_server::infrastructure::event_log::FileEventLog;
use chatingo_server::infrastructure::network::ChatServer;
use chatingo_server::infrastructure::storage::{load_config, ServerConfig};

const USAGE: &str = "Usage : chatingo --mode [server|client]";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3500;

/// How long shutdown waits for queued events to reach the log file.
const EVENT_LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Line-based TCP chat.
#[derive(Debug, Parser)]
#[command(name = "chatingo", about = "Line-based TCP chat server and client", version)]
struct Cli {
    /// `server` or `client` (case-insensitive).
    #[arg(long, default_value = "client", env = "CHATINGO_MODE")]
    mode: String,

    /// Address to bind (server) or connect to (client) [default: 127.0.0.1].
    #[arg(long, env = "CHATINGO_HOST")]
    host: Option<String>,

    /// TCP port [default: 3500].
    #[arg(long, env = "CHATINGO_PORT")]
    port: Option<u16>,

    /// Server configuration file.  A missing file means defaults.
    #[arg(long, env = "CHATINGO_CONFIG")]
    config: Option<PathBuf>,

    /// Longest accepted display name, in characters [default: 20].
    #[arg(long, env = "CHATINGO_MAX_USERNAME_LENGTH")]
    max_username_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Server,
    Client,
}

impl Mode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "server" => Some(Mode::Server),
            "client" => Some(Mode::Client),
            _ => None,
        }
    }
}

impl Cli {
    /// Builds the server configuration: file (or defaults), then CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is unreadable or invalid,
    /// or if the overridden address does not parse.
    fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(host) = &self.host {
            config.network.bind_address = host.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(max) = self.max_username_length {
            config.chat.max_username_length = max;
        }

        config.validate().context("invalid server configuration")?;
        Ok(config)
    }

    /// The server address a client connects to.
    ///
    /// # Errors
    ///
    /// Returns an error if `--host` is not an IP address.
    fn server_addr(&self) -> anyhow::Result<SocketAddr> {
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
        let port = self.port.unwrap_or(DEFAULT_PORT);
        format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid server address: '{host}:{port}'"))
    }

    /// The name length limit the client checks locally.
    ///
    /// # Errors
    ///
    /// Returns an error if `--max-username-length` is zero.
    fn client_username_limit(&self) -> anyhow::Result<usize> {
        let max = self.max_username_length.unwrap_or(MAX_USERNAME_LENGTH);
        anyhow::ensure!(max > 0, "--max-username-length must be at least 1");
        Ok(max)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match Mode::parse(&cli.mode) {
        Some(Mode::Server) => run_server(&cli).await,
        Some(Mode::Client) => {
            init_tracing("warn", true);
            let outcome = run_client(&cli).await;
            if let Err(e) = &outcome {
                eprintln!("Error: {e:#}");
            }
            // A stdin read still parked on a blocking thread would keep the
            // runtime from shutting down.
            std::process::exit(if outcome.is_ok() { 0 } else { 1 });
        }
        None => {
            println!("{USAGE}");
            Ok(())
        }
    }
}

async fn run_server(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.server_config()?;
    init_tracing(&config.logging.log_level, false);

    info!(
        "chatingo server starting on {}:{}, event log {}",
        config.network.bind_address,
        config.network.port,
        config.logging.event_log_path.display()
    );

    let (events, event_writer) = FileEventLog::spawn(config.logging.event_log_path.clone());
    let server = ChatServer::bind(&config, Arc::new(events)).await?;

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    server.serve(running).await?;

    // Sessions still running keep the queue open, so this is best-effort.
    let _ = tokio::time::timeout(EVENT_LOG_DRAIN_TIMEOUT, event_writer).await;

    info!("chatingo server stopped");
    Ok(())
}

async fn run_client(cli: &Cli) -> anyhow::Result<()> {
    let addr = cli.server_addr()?;
    let max_username_length = cli.client_username_limit()?;
    match chatingo_client::run(addr, max_username_length).await {
        Ok(()) | Err(ClientError::InputClosed) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_level`.  The client logs to stderr so that
/// diagnostics never mix with chat output.
fn init_tracing(default_level: &str, to_stderr: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if to_stderr {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.init();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
