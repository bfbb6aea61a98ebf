//! Audit logger implementation.
//!
//! Provides the main `AuditLogger` type with one helper per event type.
//! The helpers never fail: a storage error is reported through `tracing`
//! and swallowed, so auditing cannot change how a request is answered.

use handoff_core::AuditConfig;
use std::sync::Arc;

use crate::error::AuditError;
use crate::event::{AuditEvent, AuditEventType};
use crate::storage::{AuditStorage, ConsoleStorage, FileStorage, MultiStorage, NullStorage};

/// The main audit logger.
pub struct AuditLogger {
    enabled: bool,
    storage: Arc<dyn AuditStorage>,
}

impl AuditLogger {
    /// Create a new audit logger with the given configuration.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let mut backends: Vec<Arc<dyn AuditStorage>> = Vec::new();
        if config.stdout {
            backends.push(Arc::new(ConsoleStorage::new()));
        }
        if let Some(ref path) = config.file {
            backends.push(Arc::new(FileStorage::new(path)?));
        }

        let storage: Arc<dyn AuditStorage> = match backends.len() {
            0 => {
                tracing::warn!("Audit enabled without stdout or file output, events are discarded");
                Arc::new(NullStorage::new())
            }
            1 => backends.remove(0),
            _ => Arc::new(MultiStorage::new(backends)),
        };

        Ok(Self {
            enabled: true,
            storage,
        })
    }

    /// Create a logger with a custom storage backend.
    pub fn with_storage(storage: Arc<dyn AuditStorage>) -> Self {
        Self {
            enabled: true,
            storage,
        }
    }

    /// Create a disabled (no-op) logger.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            storage: Arc::new(NullStorage::new()),
        }
    }

    /// Create a console-only logger (useful for development).
    pub fn console_only() -> Self {
        Self::with_storage(Arc::new(ConsoleStorage::new()))
    }

    /// Check if logging is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log an audit event.
    pub async fn log(&self, event: AuditEvent) -> Result<(), AuditError> {
        if !self.enabled {
            return Ok(());
        }

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            outcome = ?event.outcome,
            "Audit event"
        );

        self.storage.store(event).await
    }

    async fn record(&self, event: AuditEvent) {
        let event_type = event.event_type;
        if let Err(e) = self.log(event).await {
            tracing::warn!(event_type = %event_type, error = %e, "Failed to write audit event");
        }
    }

    pub async fn token_issued(&self, subject: &str) {
        self.record(
            AuditEvent::builder(AuditEventType::TokenIssued)
                .subject(subject)
                .build(),
        )
        .await
    }

    pub async fn token_accepted(&self, subject: &str) {
        self.record(
            AuditEvent::builder(AuditEventType::TokenAccepted)
                .subject(subject)
                .build(),
        )
        .await
    }

    /// `kind` is the precise failure classification, which clients never see.
    pub async fn token_rejected(&self, kind: &str) {
        self.record(
            AuditEvent::builder(AuditEventType::TokenRejected)
                .outcome(kind)
                .build(),
        )
        .await
    }

    pub async fn artifact_stored(&self, subject: &str, handle_prefix: &str, bytes: usize) {
        self.record(
            AuditEvent::builder(AuditEventType::ArtifactStored)
                .subject(subject)
                .handle_prefix(handle_prefix)
                .artifact_bytes(bytes as u64)
                .build(),
        )
        .await
    }

    pub async fn artifact_delivered(&self, handle_prefix: &str, bytes: usize) {
        self.record(
            AuditEvent::builder(AuditEventType::ArtifactDelivered)
                .handle_prefix(handle_prefix)
                .artifact_bytes(bytes as u64)
                .build(),
        )
        .await
    }

    /// The token was good but the source had nothing for `subject`.
    pub async fn artifact_missing(&self, subject: &str) {
        self.record(
            AuditEvent::builder(AuditEventType::ArtifactMissing)
                .subject(subject)
                .build(),
        )
        .await
    }

    pub async fn vault_miss(&self, handle_prefix: &str) {
        self.record(
            AuditEvent::builder(AuditEventType::VaultMiss)
                .handle_prefix(handle_prefix)
                .build(),
        )
        .await
    }

    pub async fn internal_failure(&self, stage: &str, subject: Option<&str>) {
        let mut builder = AuditEvent::builder(AuditEventType::InternalFailure).outcome(stage);
        if let Some(subject) = subject {
            builder = builder.subject(subject);
        }
        self.record(builder.build()).await
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    struct FailingStorage;

    #[async_trait]
    impl AuditStorage for FailingStorage {
        async fn store(&self, _event: AuditEvent) -> Result<(), AuditError> {
            Err(AuditError::StorageError("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_disabled_logger() {
        let logger = AuditLogger::disabled();
        assert!(!logger.is_enabled());

        // Should not error even when logging
        logger.token_accepted("user-1").await;
        logger
            .log(AuditEvent::new(AuditEventType::TokenIssued))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_config_builds_noop_logger() {
        let config = AuditConfig {
            enabled: false,
            ..Default::default()
        };
        let logger = AuditLogger::new(config).unwrap();
        assert!(!logger.is_enabled());
    }

    #[tokio::test]
    async fn test_helpers_record_events() {
        let memory = Arc::new(MemoryStorage::new());
        let logger = AuditLogger::with_storage(memory.clone());

        logger.token_accepted("user-42").await;
        logger.artifact_stored("user-42", "AbCdEfGh", 128).await;
        logger.artifact_delivered("AbCdEfGh", 128).await;
        logger.vault_miss("AbCdEfGh").await;
        logger.token_rejected("not_yet_valid").await;
        logger.internal_failure("artifact_source", Some("user-42")).await;
        logger.artifact_missing("user-43").await;

        let events = memory.events();
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                AuditEventType::TokenAccepted,
                AuditEventType::ArtifactStored,
                AuditEventType::ArtifactDelivered,
                AuditEventType::VaultMiss,
                AuditEventType::TokenRejected,
                AuditEventType::InternalFailure,
                AuditEventType::ArtifactMissing,
            ]
        );
        assert_eq!(events[1].artifact_bytes, Some(128));
        assert_eq!(events[4].outcome.as_deref(), Some("not_yet_valid"));
        assert!(events[4].subject.is_none());
        assert_eq!(events[6].subject.as_deref(), Some("user-43"));
    }

    #[tokio::test]
    async fn test_storage_failure_is_swallowed() {
        let logger = AuditLogger::with_storage(Arc::new(FailingStorage));
        // Helpers return unit; the failure only reaches tracing.
        logger.vault_miss("deadbeef").await;
        assert!(
            logger
                .log(AuditEvent::new(AuditEventType::VaultMiss))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_file_output_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let config = AuditConfig {
            enabled: true,
            stdout: false,
            file: Some(path.clone()),
        };

        let logger = AuditLogger::new(config).unwrap();
        logger.token_issued("user-7").await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let event: AuditEvent = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(event.event_type, AuditEventType::TokenIssued);
        assert_eq!(event.subject.as_deref(), Some("user-7"));
    }
}
