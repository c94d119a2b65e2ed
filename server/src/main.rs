use anyhow::Result;
use dat1_proxy::{run_server, AppState, ProxyConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dat1_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProxyConfig::from_env()?;
    if config.api_key.is_none() {
        tracing::warn!("DAT1_API_KEY is not set; chat requests will fail until it is");
    }
    tracing::info!(endpoint = %config.endpoint, "proxying to upstream");

    let addr = config.addr()?;
    let state = AppState::new(&config);
    run_server(state, addr).await
}
