//! Audit logging configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Write events to stdout as JSON lines.
    #[serde(default = "default_enabled")]
    pub stdout: bool,

    /// Append events to this file as JSON lines.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            stdout: default_enabled(),
            file: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}
