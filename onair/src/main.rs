use anyhow::{Context, Result};
use clap::Parser;
use onair_core::IceServerConfig;
use onair_server::{
    AppState, ChatLedger, HttpLedger, InMemoryStreamStore, LedgerForwarder, ServerConfig,
    StreamStore, TokenVerifier, TracingLedger, router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "onair")]
#[command(about = "Live-room signaling and presence server")]
struct Cli {
    /// Address the HTTP and WebSocket listener binds to.
    #[arg(long, env = "ONAIR_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// HS256 secret used to verify bearer tokens.
    #[arg(long, env = "ONAIR_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// JSON array of stream records to seed the stream store with.
    #[arg(long, env = "ONAIR_STREAMS_FILE")]
    streams_file: Option<PathBuf>,

    /// Remote ledger endpoint for chat messages. Logged locally when unset.
    #[arg(long, env = "ONAIR_LEDGER_URL")]
    ledger_url: Option<String>,

    #[arg(long, env = "ONAIR_LEDGER_QUEUE", default_value_t = 256)]
    ledger_queue: usize,

    /// Refuse real-time joins to rooms that were not created first.
    #[arg(long, env = "ONAIR_STRICT_ROOMS")]
    strict_rooms: bool,

    #[arg(long, env = "ONAIR_MAX_PENDING_CANDIDATES")]
    max_pending_candidates: Option<usize>,

    #[arg(long, env = "TURN_URL")]
    turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME")]
    turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL", hide_env_values = true)]
    turn_credential: Option<String>,

    /// Tracing filter directive, e.g. `info,onair_server=debug`.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_filter: String,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let ice_servers = self
            .turn_url
            .iter()
            .map(|url| IceServerConfig {
                urls: vec![url.clone()],
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            })
            .collect();

        ServerConfig {
            allow_lazy_rooms: !self.strict_rooms,
            max_pending_candidates: self.max_pending_candidates,
            ledger_queue: self.ledger_queue,
            ice_servers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_filter).context("Invalid log filter")?)
        .init();

    info!("Initializing onair server...");

    let config = cli.server_config();
    if config.ice_servers.is_empty() {
        warn!("TURN_URL is not set, clients get no ICE servers");
    }

    let streams: Arc<dyn StreamStore> = match &cli.streams_file {
        Some(path) => Arc::new(InMemoryStreamStore::from_json_file(path).await?),
        None => {
            warn!("No streams file given, starting with an empty stream store");
            Arc::new(InMemoryStreamStore::new())
        }
    };

    let ledger: Arc<dyn ChatLedger> = match &cli.ledger_url {
        Some(url) => {
            info!("Forwarding chat to ledger at {}", url);
            Arc::new(HttpLedger::new(url.clone()))
        }
        None => Arc::new(TracingLedger),
    };
    let (ledger_handle, ledger_task) = LedgerForwarder::spawn(ledger, config.ledger_queue);

    let verifier = TokenVerifier::new(cli.jwt_secret.as_bytes());
    let state = AppState::new(&config, verifier, streams, ledger_handle);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    info!("Signaling server listening on http://{}", cli.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router (and every ledger handle in it) is gone; let the queue drain.
    if tokio::time::timeout(Duration::from_secs(5), ledger_task)
        .await
        .is_err()
    {
        warn!("Ledger forwarder did not drain in time");
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
