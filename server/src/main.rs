mod api;
mod error;

use anyhow::Context;
use axum::Router;
use push_engine::{
    config::Config, registry::MemoryRegistry, transport::HyperTransport, Dispatcher,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LISTEN_ADDR: &str = "LISTEN_ADDR";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3030";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,push_engine=debug,push_server=debug")),
        )
        .init();

    let config = Config::from_env().context("could not load push configuration")?;
    let listen_addr: SocketAddr = std::env::var(LISTEN_ADDR)
        .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string())
        .parse()
        .with_context(|| format!("{} is not a socket address", LISTEN_ADDR))?;

    info!(
        subject = config.identity.subject(),
        public_key = config.identity.public_key(),
        concurrency = config.concurrency,
        timeout = ?config.timeout,
        "loaded push configuration"
    );

    let registry = Arc::new(MemoryRegistry::new());
    let transport = Arc::new(HyperTransport::new(config.timeout));
    let dispatcher = Dispatcher::new(config.identity, registry.clone(), transport)
        .with_concurrency(config.concurrency);

    let app = Router::new()
        .nest("/api", api::routes())
        .with_state(api::AppState {
            dispatcher,
            registry,
        });

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(%listen_addr, "push server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl+C, shutting down");
        })
        .await?;

    Ok(())
}
