//! Error types for the vault crate.

use thiserror::Error;

/// Errors that can occur during vault and cipher operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    /// The handle is unknown, already consumed, or expired.
    ///
    /// The three cases are deliberately indistinguishable.
    #[error("artifact not found")]
    NotFound,

    /// The ciphertext did not decrypt under the given key and IV.
    #[error("artifact decryption failed")]
    DecryptionFailed,

    /// Key or IV material has the wrong length.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}
