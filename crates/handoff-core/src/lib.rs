//! # handoff-core
//!
//! Types shared by every Handoff crate:
//!
//! - [`config`]: the YAML configuration (`handoff.yaml`) and its sections
//! - [`clock`]: the wall clock used for token freshness and vault expiry
//!
//! The clock is injectable so that freshness windows and TTLs can be
//! exercised at exact millisecond boundaries in tests.

pub mod clock;
pub mod config;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{
    ArtifactConfig, AuditConfig, ConfigError, CoreConfig, KeyConfig, ServerConfig, TokenConfig,
    VaultConfig,
};
