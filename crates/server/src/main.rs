use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::{ServerConfig, demo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let addr = config.bind_addr();
    let state = demo::build_state(config).context("building demo state")?;
    let router = demo::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "serving JSON:API");
    axum::serve(listener, router).await.context("serving")?;
    Ok(())
}
