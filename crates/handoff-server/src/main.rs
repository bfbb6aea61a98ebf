use handoff_core::CoreConfig;
use handoff_server::HandoffServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // HANDOFF_CONFIG or ./handoff.yaml
    let config = CoreConfig::load(None)?;
    HandoffServer::from_config(config)?.run().await?;

    Ok(())
}
