use std::sync::Arc;

use crate::config::ProxyConfig;
use crate::upstream::UpstreamClient;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            upstream: Arc::new(UpstreamClient::new(config)),
        }
    }
}
