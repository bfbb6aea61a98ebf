//! Configuration types for the Handoff identity bridge.
//!
//! Configuration is loaded from a single YAML file (`handoff.yaml` by default,
//! or the path in `HANDOFF_CONFIG`). Every section has defaults, so an empty
//! file yields a usable development configuration.
//!
//! ```yaml
//! server:
//!   listen_port: 9900
//! keys:
//!   private_key_file: keys/private_key.pem
//!   public_key_file: keys/public_key.pem
//! token:
//!   validity_secs: 300
//!   clock_skew_secs: 180
//! vault:
//!   ttl_secs: 30
//! ```

pub mod audit;
pub mod keys;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use audit::AuditConfig;
pub use keys::KeyConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "HANDOFF_CONFIG";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "handoff.yaml";

/// Complete Handoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Key material locations.
    #[serde(default)]
    pub keys: KeyConfig,

    /// Identity token freshness window.
    #[serde(default)]
    pub token: TokenConfig,

    /// Artifact vault settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Local artifact source.
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Audit logging.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port to bind.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Externally visible base URL used when building viewer links.
    /// Falls back to `http://{listen_addr}:{listen_port}`.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Expose the development link generator endpoint.
    #[serde(default)]
    pub enable_link_generator: bool,
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }

    /// Base URL for generated links, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.bind_address()),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
            public_base_url: None,
            enable_link_generator: false,
        }
    }
}

/// Freshness window for identity tokens.
///
/// A token is accepted while `-clock_skew <= age <= validity + clock_skew`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Nominal validity of a token, in seconds.
    #[serde(default = "default_validity_secs")]
    pub validity_secs: u64,

    /// Tolerated disagreement between issuer and validator clocks, in seconds.
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,
}

impl TokenConfig {
    pub fn validity(&self) -> Duration {
        Duration::from_secs(self.validity_secs)
    }

    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.clock_skew_secs)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            validity_secs: default_validity_secs(),
            clock_skew_secs: default_clock_skew_secs(),
        }
    }
}

/// Artifact vault configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Lifetime of an unconsumed artifact, in seconds.
    #[serde(default = "default_vault_ttl_secs")]
    pub ttl_secs: u64,

    /// Sweep expired entries after every store.
    #[serde(default = "default_true")]
    pub purge_on_store: bool,

    /// Interval for the background sweep task. Disabled when unset.
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

impl VaultConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_vault_ttl_secs(),
            purge_on_store: true,
            sweep_interval_secs: None,
        }
    }
}

/// Local directory the artifact source reads from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory holding per-subject artifacts (`<subject>.<ext>`).
    #[serde(default = "default_artifact_dir")]
    pub directory: PathBuf,

    /// File served when no per-subject artifact exists. Relative paths are
    /// taken from `directory`.
    #[serde(default)]
    pub default_file: Option<PathBuf>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            directory: default_artifact_dir(),
            default_file: None,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    9900
}

fn default_validity_secs() -> u64 {
    5 * 60
}

fn default_clock_skew_secs() -> u64 {
    3 * 60
}

fn default_vault_ttl_secs() -> u64 {
    30
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, resolving relative paths against the file's directory.
    ///
    /// When `path` is `None`, `HANDOFF_CONFIG` is consulted, then
    /// `handoff.yaml` in the working directory. A missing default file yields
    /// the default configuration; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var(CONFIG_ENV) {
                Ok(p) => (PathBuf::from(p), true),
                Err(_) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let mut config = Self::from_file(&path)?;
        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        config.resolve_paths(&base_dir);
        Ok(config)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base_dir.join(p)
            }
        };

        self.keys.private_key_file = self.keys.private_key_file.as_ref().map(resolve);
        self.keys.public_key_file = self.keys.public_key_file.as_ref().map(resolve);
        self.artifacts.directory = resolve(&self.artifacts.directory);
        self.audit.file = self.audit.file.as_ref().map(resolve);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token.validity_secs == 0 {
            return Err(ConfigError::Config(
                "token.validity_secs must be greater than zero".to_string(),
            ));
        }
        if self.vault.ttl_secs == 0 {
            return Err(ConfigError::Config(
                "vault.ttl_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
