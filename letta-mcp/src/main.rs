//! `letta-mcp` binary: configure from the environment and serve.

use std::sync::Arc;

use letta_mcp::core::{LogFormat, TransportKind};
use letta_mcp::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    init_tracing(settings.log_format());

    info!(
        base_url = settings.base_url(),
        transport = ?settings.transport(),
        "Starting letta-mcp"
    );

    let client = LettaClient::from_settings(&settings)?;
    let registry = build_registry()?;
    info!(tools = registry.len(), "Registered hubs");

    let server = McpServer::new(Arc::new(registry), Arc::new(client));

    tokio::select! {
        result = serve(server, &settings) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    Ok(())
}

// stdout belongs to the stdio protocol, so logs always go to stderr.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn serve(server: McpServer, settings: &Settings) -> anyhow::Result<()> {
    match settings.transport() {
        TransportKind::Stdio => server.run_stdio().await?,
        TransportKind::Http => serve_http(server, settings.port()).await?,
    }
    Ok(())
}

#[cfg(feature = "http")]
async fn serve_http(server: McpServer, port: u16) -> anyhow::Result<()> {
    server.serve_http(([0, 0, 0, 0], port)).await?;
    Ok(())
}

#[cfg(not(feature = "http"))]
async fn serve_http(_server: McpServer, _port: u16) -> anyhow::Result<()> {
    anyhow::bail!("TRANSPORT=http requires the `http` feature")
}
