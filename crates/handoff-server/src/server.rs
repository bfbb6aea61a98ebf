//! Server lifecycle.
//!
//! The vault lives exactly as long as the server: created at startup,
//! optionally swept on a timer, and drained once the listener has stopped.

use crate::error::ServerError;
use crate::routes;
use crate::state::AppState;
use handoff_core::CoreConfig;
use handoff_vault::ArtifactVault;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// The Handoff HTTP server.
pub struct HandoffServer {
    config: CoreConfig,
    state: AppState,
}

impl HandoffServer {
    pub fn new(config: CoreConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Load keys, audit and artifact source from configuration.
    pub fn from_config(config: CoreConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config)?;
        Ok(Self::new(config, state))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.server.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::StartupFailed(format!("failed to bind {addr}: {e}")))?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an existing listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let vault = self.state.vault().clone();
        let sweeper = self
            .config
            .vault
            .sweep_interval()
            .map(|every| spawn_sweeper(vault.clone(), every));

        let local = listener
            .local_addr()
            .map_err(|e| ServerError::StartupFailed(e.to_string()))?;
        tracing::info!(
            address = %local,
            ttl_ms = vault.default_ttl().as_millis() as u64,
            sweeping = sweeper.is_some(),
            "Handoff server listening"
        );

        let app = routes::create_router(self.state);
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        let drained = vault.drain();
        tracing::info!(drained, "Handoff server stopped");

        result
    }
}

/// Periodically remove expired entries. Correctness never depends on this
/// task; it only bounds memory held by abandoned handles.
pub fn spawn_sweeper(vault: Arc<ArtifactVault>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            vault.purge_expired();
        }
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_on_interval() {
        let clock = Arc::new(ManualClock::new(1_000));
        let vault = Arc::new(
            ArtifactVault::with_clock(Duration::from_secs(30), clock.clone()).purge_on_store(false),
        );
        vault.store(vec![1], [0; 16], [0; 16], Duration::from_millis(10));
        vault.store(vec![2], [0; 16], [0; 16], Duration::from_secs(60));
        clock.advance(100);

        let sweeper = spawn_sweeper(vault.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(vault.len(), 1);
        assert_eq!(vault.stats().expired, 1);
        sweeper.abort();
    }
}
