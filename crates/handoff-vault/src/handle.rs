//! Single-use vault handles.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Bytes of randomness in a handle (128 bits).
pub const HANDLE_BYTES: usize = 16;

/// Length of the logged handle prefix.
const LOG_PREFIX_LEN: usize = 8;

/// A random, URL-safe reference to one vault entry.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VaultHandle(String);

impl VaultHandle {
    /// Generate a fresh handle.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; HANDLE_BYTES];
        rng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Short prefix safe to put in logs.
    pub fn log_prefix(&self) -> &str {
        log_prefix(&self.0)
    }
}

/// Short prefix of a raw handle string, safe to put in logs.
pub fn log_prefix(handle: &str) -> &str {
    match handle.char_indices().nth(LOG_PREFIX_LEN) {
        Some((idx, _)) => &handle[..idx],
        None => handle,
    }
}

impl std::fmt::Display for VaultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for VaultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VaultHandle({}…)", self.log_prefix())
    }
}

impl AsRef<str> for VaultHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
