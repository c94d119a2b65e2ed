//! # dat1-proxy
//!
//! Thin HTTP proxy in front of the dat1 chat-completion API. It adds the
//! `X-API-Key` credential and either buffers the reply (`POST /api/chat`) or
//! relays the upstream SSE stream untouched (`POST /api/chat/stream`).

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod upstream;

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use state::AppState;
pub use upstream::UpstreamClient;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/chat/stream", post(handlers::chat_stream))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
