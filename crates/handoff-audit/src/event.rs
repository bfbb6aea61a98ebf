//! Audit event types.
//!
//! Every event carries when it happened and what kind it is. Subject, outcome
//! and handle prefix are filled in when the emitting step knows them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // ===== Token events =====
    /// A token was minted.
    TokenIssued,
    /// A token was decoded and is fresh.
    TokenAccepted,
    /// A token was rejected.
    TokenRejected,

    // ===== Vault events =====
    /// An encrypted artifact was stored.
    ArtifactStored,
    /// An artifact was handed out.
    ArtifactDelivered,
    /// An accepted subject had no artifact to deliver.
    ArtifactMissing,
    /// A handle lookup found nothing deliverable.
    VaultMiss,

    /// Unexpected failure on the server side.
    InternalFailure,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenIssued => "token_issued",
            Self::TokenAccepted => "token_accepted",
            Self::TokenRejected => "token_rejected",
            Self::ArtifactStored => "artifact_stored",
            Self::ArtifactDelivered => "artifact_delivered",
            Self::ArtifactMissing => "artifact_missing",
            Self::VaultMiss => "vault_miss",
            Self::InternalFailure => "internal_failure",
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    /// Event type.
    pub event_type: AuditEventType,

    /// Subject identifier, once a token has been decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Outcome detail, e.g. the failure kind of a rejected token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,

    /// First characters of the vault handle involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_prefix: Option<String>,

    /// Size in bytes of the artifact involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_bytes: Option<u64>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event_type,
            subject: None,
            outcome: None,
            handle_prefix: None,
            artifact_bytes: None,
        }
    }

    /// Create a builder for an audit event.
    pub fn builder(event_type: AuditEventType) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type)
    }
}

/// Builder for creating audit events.
#[derive(Debug)]
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event: AuditEvent::new(event_type),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.event.subject = Some(subject.into());
        self
    }

    pub fn outcome(mut self, outcome: impl Into<String>) -> Self {
        self.event.outcome = Some(outcome.into());
        self
    }

    /// Set the handle prefix. Never pass a full handle.
    pub fn handle_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event.handle_prefix = Some(prefix.into());
        self
    }

    pub fn artifact_bytes(mut self, bytes: u64) -> Self {
        self.event.artifact_bytes = Some(bytes);
        self
    }

    pub fn build(self) -> AuditEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_serializes_snake_case() {
        let json = serde_json::to_string(&AuditEventType::ArtifactDelivered).unwrap();
        assert_eq!(json, "\"artifact_delivered\"");
        assert_eq!(AuditEventType::VaultMiss.to_string(), "vault_miss");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let event = AuditEvent::builder(AuditEventType::TokenRejected)
            .outcome("expired")
            .build();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event_type"], "token_rejected");
        assert_eq!(value["outcome"], "expired");
        assert!(value.get("subject").is_none());
        assert!(value.get("handle_prefix").is_none());
    }
}
