//! # handoff-audit
//!
//! Audit trail for identity handoffs.
//!
//! Clients only ever see coarse outcomes (401, 404, 500). The audit trail is
//! where the precise reason lands: which failure kind rejected a token, which
//! handle prefix was delivered or missed, and when.
//!
//! ## Event Types
//!
//! | Event Type | Description |
//! |------------|-------------|
//! | `TokenIssued` | A token was minted for a subject |
//! | `TokenAccepted` | A token passed decoding and freshness checks |
//! | `TokenRejected` | A token failed; `outcome` carries the failure kind |
//! | `ArtifactStored` | An encrypted artifact entered the vault |
//! | `ArtifactDelivered` | A handle was consumed successfully |
//! | `VaultMiss` | A handle was unknown, consumed, or expired |
//! | `InternalFailure` | Something broke on our side |
//!
//! Output is JSON Lines, to stdout and/or a file. Audit failures are logged
//! with `tracing` and never change a request's outcome.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use handoff_audit::AuditLogger;
//! use handoff_core::AuditConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = AuditLogger::new(AuditConfig::default())?;
//! logger.token_accepted("user-42").await;
//! logger.token_rejected("expired").await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod logger;
pub mod storage;

pub use error::AuditError;
pub use event::{AuditEvent, AuditEventBuilder, AuditEventType};
pub use logger::AuditLogger;
pub use storage::{
    AuditStorage, ConsoleStorage, FileStorage, MemoryStorage, MultiStorage, NullStorage,
};
