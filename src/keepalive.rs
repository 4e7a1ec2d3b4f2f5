use std::net::SocketAddr;

use anyhow::Result;
use axum::{Router, routing::get};
use tokio::net::TcpListener;

pub const ALIVE_BODY: &str = "Bot alive";

/// Single route for uptime pingers: `GET /` → `Bot alive`.
pub fn router() -> Router {
    Router::new().route("/", get(|| async { ALIVE_BODY }))
}

/// Binds and serves forever.
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener).await
}

pub async fn serve_on(listener: TcpListener) -> Result<()> {
    tracing::info!(addr=%listener.local_addr()?, "keep-alive server ready");
    axum::serve(listener, router()).await?;
    Ok(())
}
