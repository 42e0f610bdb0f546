//! Local xAPI Learning Record Store (v1)
//!
//! Runs an [`LrsServer`] with an in-memory host: statements are logged,
//! agent profiles and activity state are kept until the process exits.
//!
//! ```text
//! local-lrs --config lrs.toml
//! local-lrs --address http://127.0.0.1 --port 8080
//! ```

mod host;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use local_lrs::config::{load_config, LrsConfig};
use local_lrs::lifecycle::signals::shutdown_signal;
use local_lrs::observability::{logging, metrics};
use local_lrs::{LrsDelegate, LrsServer, StateMethod};

use crate::host::MemoryHost;

#[derive(Debug, Parser)]
#[command(name = "local-lrs", version, about = "Local xAPI Learning Record Store")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listener address, e.g. http://127.0.0.1 (overrides the file)
    #[arg(long)]
    address: Option<String>,

    /// Listener port (overrides the file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => LrsConfig::default(),
    };
    if let Some(address) = cli.address {
        config.listener.address = address;
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("local-lrs v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let host = Arc::new(MemoryHost::default());
    let delegate: Arc<dyn LrsDelegate> = host.clone();
    let server = LrsServer::from_config(&config, Some(delegate))?;

    server.on_statement_received(|event| {
        tracing::info!(
            statement_id = ?event.statement.id(),
            verb = ?event.statement.get("verb").and_then(|verb| verb.get("id")),
            "Statement received"
        );
        Ok(())
    });

    let profiles = Arc::clone(&host);
    server.on_agent_profile_received(move |event| {
        profiles.store_profile(event.document.clone());
        Ok(())
    });

    for method in [
        StateMethod::Get,
        StateMethod::Post,
        StateMethod::Put,
        StateMethod::Delete,
    ] {
        let state = Arc::clone(&host);
        server.set_state_handler(method, move |request, writer| {
            state.handle_state(method, request, writer)
        });
    }

    server.start().await?;
    tracing::info!(
        url = %server.url()?,
        endpoint = %server.encoded_url(),
        max_connections = config.listener.max_connections,
        "LRS ready"
    );

    shutdown_signal().await;
    server.close();

    tracing::info!(
        profiles = host.profile_count(),
        states = host.state_count(),
        "Shutdown complete"
    );
    Ok(())
}
