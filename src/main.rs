use anyhow::Result;
use backoffice::config::AppConfig;
use backoffice::server::ServerBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("backoffice=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(backend = ?config.backend, "starting back office");

    ServerBuilder::new().with_config(config).serve().await
}
