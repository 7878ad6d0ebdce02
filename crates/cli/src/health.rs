//! Liveness endpoint: one unauthenticated route returning a static body,
//! used by hosting platforms to probe the process. Runs as its own task
//! and shares no state with the poll cycle.

use {
    axum::{Router, routing::get},
    tracing::info,
};

pub async fn serve(port: u16) -> anyhow::Result<()> {
    let app = Router::new().route("/", get(|| async { "running" }));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "liveness endpoint listening");
    axum::serve(listener, app).await?;
    Ok(())
}
