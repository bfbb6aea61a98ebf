//! `handoff serve` - Run the HTTP bridge.

use anyhow::Context;
use handoff_core::CoreConfig;
use handoff_server::HandoffServer;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = CoreConfig::load(config_path).context("Failed to load configuration")?;
    tracing::info!(
        bind = %config.server.bind_address(),
        artifacts = %config.artifacts.directory.display(),
        link_generator = config.server.enable_link_generator,
        "Starting Handoff"
    );

    let server = HandoffServer::from_config(config).context("Failed to initialize server")?;
    server.run().await?;
    Ok(())
}
