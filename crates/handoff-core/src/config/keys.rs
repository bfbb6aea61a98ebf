//! Key material configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the RSA key pair is loaded from.
///
/// Keys are PEM encoded: PKCS#8 for the private key, SPKI for the public key.
/// Environment variables take precedence over files. The issuing side only
/// needs the public key; the validating side needs the private key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Environment variable containing the PEM-encoded public key.
    #[serde(default = "default_public_key_env")]
    pub public_key_env: Option<String>,

    /// Path to the PEM-encoded public key file.
    #[serde(default)]
    pub public_key_file: Option<PathBuf>,

    /// Environment variable containing the PEM-encoded private key.
    #[serde(default = "default_private_key_env")]
    pub private_key_env: Option<String>,

    /// Path to the PEM-encoded private key file.
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            public_key_env: default_public_key_env(),
            public_key_file: None,
            private_key_env: default_private_key_env(),
            private_key_file: None,
        }
    }
}

impl KeyConfig {
    /// Resolve the public key PEM from environment or file.
    pub fn resolve_public_key(&self) -> Result<Option<String>, std::io::Error> {
        resolve_pem(self.public_key_env.as_deref(), self.public_key_file.as_ref())
    }

    /// Resolve the private key PEM from environment or file.
    pub fn resolve_private_key(&self) -> Result<Option<String>, std::io::Error> {
        resolve_pem(
            self.private_key_env.as_deref(),
            self.private_key_file.as_ref(),
        )
    }
}

fn resolve_pem(
    env_var: Option<&str>,
    path: Option<&PathBuf>,
) -> Result<Option<String>, std::io::Error> {
    if let Some(env_var) = env_var {
        if let Ok(pem) = std::env::var(env_var) {
            if !pem.trim().is_empty() {
                return Ok(Some(pem));
            }
        }
    }

    if let Some(path) = path {
        if path.exists() {
            return Ok(Some(std::fs::read_to_string(path)?));
        }
    }

    Ok(None)
}

fn default_public_key_env() -> Option<String> {
    Some("HANDOFF_PUBLIC_KEY".to_string())
}

fn default_private_key_env() -> Option<String> {
    Some("HANDOFF_PRIVATE_KEY".to_string())
}
