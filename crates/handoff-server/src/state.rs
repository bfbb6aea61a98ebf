//! Shared application state.

use crate::error::ServerError;
use crate::source::{ArtifactSource, DirectorySource};
use handoff_audit::AuditLogger;
use handoff_core::{CoreConfig, SharedClock, SystemClock};
use handoff_token::{FreshnessPolicy, TokenIssuer, TokenValidator, load_key_provider};
use handoff_vault::ArtifactVault;
use std::sync::Arc;

/// Shared application state, cheap to clone into every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    validator: TokenValidator,
    /// Only present when the link generator is enabled.
    issuer: Option<TokenIssuer>,
    vault: Arc<ArtifactVault>,
    source: Arc<dyn ArtifactSource>,
    audit: Arc<AuditLogger>,
    base_url: String,
}

impl AppState {
    pub fn new(
        validator: TokenValidator,
        vault: Arc<ArtifactVault>,
        source: Arc<dyn ArtifactSource>,
        audit: Arc<AuditLogger>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                validator,
                issuer: None,
                vault,
                source,
                audit,
                base_url: base_url.into(),
            }),
        }
    }

    /// Enable the link generator with the given issuer.
    ///
    /// Must be called before the state is shared.
    pub fn with_issuer(self, issuer: TokenIssuer) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => Self {
                inner: Arc::new(AppStateInner {
                    issuer: Some(issuer),
                    ..inner
                }),
            },
            Err(inner) => {
                tracing::warn!("AppState already shared, link generator not enabled");
                Self { inner }
            }
        }
    }

    /// Build the full state from configuration on the system clock.
    pub fn from_config(config: &CoreConfig) -> Result<Self, ServerError> {
        Self::from_config_with_clock(config, SystemClock::shared())
    }

    pub fn from_config_with_clock(
        config: &CoreConfig,
        clock: SharedClock,
    ) -> Result<Self, ServerError> {
        let keys = load_key_provider(&config.keys)
            .map_err(|e| ServerError::StartupFailed(format!("key material: {e}")))?;

        let validator = TokenValidator::with_clock(
            keys.clone(),
            FreshnessPolicy::from_config(&config.token),
            clock.clone(),
        )
        .map_err(|e| ServerError::StartupFailed(format!("token validator: {e}")))?;

        let vault = Arc::new(ArtifactVault::from_config(&config.vault, clock.clone()));
        let source: Arc<dyn ArtifactSource> =
            Arc::new(DirectorySource::from_config(&config.artifacts));
        let audit = AuditLogger::new(config.audit.clone())
            .map_err(|e| ServerError::StartupFailed(format!("audit logger: {e}")))?;

        let state = Self::new(
            validator,
            vault,
            source,
            Arc::new(audit),
            config.server.base_url(),
        );

        if config.server.enable_link_generator {
            tracing::warn!("Link generator enabled; do not expose this in production");
            Ok(state.with_issuer(TokenIssuer::with_clock(keys, clock)))
        } else {
            Ok(state)
        }
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.inner.validator
    }

    pub fn issuer(&self) -> Option<&TokenIssuer> {
        self.inner.issuer.as_ref()
    }

    pub fn vault(&self) -> &Arc<ArtifactVault> {
        &self.inner.vault
    }

    pub fn source(&self) -> &dyn ArtifactSource {
        self.inner.source.as_ref()
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.inner.audit
    }

    /// Public base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }
}
