use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use kbase_core::config::Config;
use kbase_retrieval::{load_resources, AppState};
use kbase_server::{init_tracing, serve, shutdown_signal};

/// Semantic search service over a prebuilt knowledge base.
#[derive(Parser)]
#[command(name = "kbase-server", version, about)]
struct Args {
    /// Bind host; overrides `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Bind port; overrides `server.port`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut settings = Config::load()?.settings()?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    let retriever = match load_resources(&settings).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("failed to load knowledge base: {e:#}");
            return Err(e);
        }
    };
    tracing::info!(vectors = retriever.index_size(), model = retriever.model_id(), "knowledge base ready");
    let state = AppState::ready(Arc::new(retriever), settings.search);

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    serve(listener, state, shutdown_signal()).await
}
