//! Position gateway entry point
//!
//! 1. Loads `.env` and the YAML gateway configuration
//! 2. Connects the Supabase record store
//! 3. Builds one adapter per exchange
//! 4. Serves the HTTP API until Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use position_gateway::adapters::AdapterRegistry;
use position_gateway::config::{self, constants, SupabaseConfig};
use position_gateway::core::{Gateway, SupabaseStore};
use position_gateway::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenvy::dotenv().ok();

    config::logging::init_logging();
    info!(phase = "init", version = env!("CARGO_PKG_VERSION"), "Position gateway starting");
    constants::log_configuration();

    let gateway_config = config::load_config_or_default(&constants::gateway_config_path())
        .context("loading gateway configuration")?;
    let supabase = SupabaseConfig::from_env().context("loading Supabase configuration")?;
    let store = SupabaseStore::new(supabase).context("building Supabase client")?;

    let registry = AdapterRegistry::from_config(&gateway_config);
    let gateway = Gateway::new(Arc::new(store), registry, &gateway_config.timeouts);
    let app = server::router(AppState::new(gateway));

    let port = constants::port_override().unwrap_or(gateway_config.server.port);
    let addr: SocketAddr = format!("{}:{}", constants::bind_addr(), port)
        .parse()
        .context("parsing bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(phase = "init", %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("[SHUTDOWN] Clean exit");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("[SHUTDOWN] Graceful shutdown initiated"),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
