//! Route handlers: buffered chat, streaming chat, health.

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde_json::{json, Value};
use shared::ChatRequest;

use crate::error::ProxyError;
use crate::state::AppState;

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, ProxyError> {
    tracing::info!(messages = request.messages.len(), "buffered chat request");
    let completion = state.upstream.complete(&request).await?;
    Ok(Json(completion))
}

/// Relays the upstream SSE body chunk by chunk. Once headers are out, an
/// upstream transport failure can only end the body early.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ProxyError> {
    tracing::info!(messages = request.messages.len(), "streaming chat request");
    let upstream = state.upstream.stream(&request).await?;

    let body = Body::from_stream(upstream.inspect_err(|e| {
        tracing::warn!(error = %e, "upstream stream broke off");
    }));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
