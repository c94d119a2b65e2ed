//! Client for the dat1 chat-completion endpoint.

use std::pin::Pin;

use axum::body::Bytes;
use futures::Stream;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use shared::{ChatMessage, ChatRequest};

use crate::config::ProxyConfig;
use crate::error::ProxyError;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 5000;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

#[derive(Serialize, Debug)]
struct UpstreamRequest {
    messages: Vec<ChatMessage>,
    temperature: f64,
    stream: bool,
    max_tokens: u32,
}

impl UpstreamRequest {
    /// Callers' reasoning text is never forwarded.
    fn new(request: &ChatRequest, stream: bool) -> Self {
        Self {
            messages: request.messages.iter().map(ChatMessage::for_upstream).collect(),
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            stream,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

pub struct UpstreamClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Buffered completion; the upstream JSON comes back as-is.
    pub async fn complete(&self, request: &ChatRequest) -> Result<Value, ProxyError> {
        let res = self.send(request, false).await?;
        Ok(res.json().await?)
    }

    /// Streaming completion; the SSE body is handed back without inspection.
    pub async fn stream(&self, request: &ChatRequest) -> Result<ByteStream, ProxyError> {
        let res = self.send(request, true).await?;
        Ok(Box::pin(res.bytes_stream()))
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<Response, ProxyError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProxyError::Configuration("DAT1_API_KEY is not set".to_string())
        })?;

        let body = UpstreamRequest::new(request, stream);
        tracing::debug!(
            endpoint = %self.endpoint,
            stream,
            messages = body.messages.len(),
            temperature = body.temperature,
            max_tokens = body.max_tokens,
            "forwarding chat request"
        );

        let res = self
            .client
            .post(&self.endpoint)
            .header("X-API-Key", api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await?;
            tracing::warn!(status, body = %body, "upstream rejected chat request");
            return Err(ProxyError::Upstream { status, body });
        }

        Ok(res)
    }
}
