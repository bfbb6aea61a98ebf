//! # handoff-vault
//!
//! One-time, TTL-bound storage for encrypted artifacts.
//!
//! A validated request renders an artifact, seals it under a fresh AES-128
//! key and IV ([`cipher::seal`]) and stores the ciphertext in the
//! [`ArtifactVault`]. The caller hands out the returned [`VaultHandle`]
//! together with the key and IV; the ciphertext is released exactly once,
//! and never after its TTL (30 seconds by default).

pub mod cipher;
pub mod error;
pub mod handle;
pub mod vault;

pub use cipher::{IV_LEN, KEY_LEN, SealedArtifact, open, seal};
pub use error::VaultError;
pub use handle::VaultHandle;
pub use vault::{ArtifactEntry, ArtifactVault, VaultStats};
