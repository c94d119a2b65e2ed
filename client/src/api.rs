//! HTTP client for the dat1 proxy routes.

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Client, Response};
use serde_json::Value;
use shared::{ChatCompletion, ChatRequest};

use crate::error::ClientError;

pub type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

#[derive(Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion, ClientError> {
        let res = self.post("/api/chat", request).await?;
        let text = res.text().await?;
        ChatCompletion::parse(&text).map_err(|e| ClientError::Malformed(e.to_string()))
    }

    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<ByteStream, ClientError> {
        let res = self.post("/api/chat/stream", request).await?;
        Ok(res.bytes_stream().boxed())
    }

    async fn post(&self, route: &str, request: &ChatRequest) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, route);
        tracing::debug!(%url, messages = request.messages.len(), "sending chat request");

        let res = self.client.post(&url).json(request).send().await?;
        if !res.status().is_success() {
            return Err(proxy_error(res).await);
        }
        Ok(res)
    }
}

/// Prefer the proxy's `{"error": {"message"}}` text, fall back to the raw body.
async fn proxy_error(res: Response) -> ClientError {
    let status = res.status().as_u16();
    let body = match res.text().await {
        Ok(body) => body,
        Err(e) => return ClientError::Transport(e),
    };
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    ClientError::Proxy { status, message }
}
