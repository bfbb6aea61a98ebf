//! RSA key material for identity tokens.

use crate::error::TokenError;
use handoff_core::KeyConfig;
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::Path;
use std::sync::Arc;

/// Default modulus size for generated keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Supplies the key material loaded at startup.
///
/// Keys are immutable for the lifetime of the process. The issuing side may
/// hold only the public key, in which case [`KeyProvider::private_key`]
/// returns `None`.
pub trait KeyProvider: Send + Sync {
    fn public_key(&self) -> &RsaPublicKey;

    fn private_key(&self) -> Option<&RsaPrivateKey>;
}

/// An RSA keypair for encrypting and decrypting identity tokens.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a new random keypair with the given modulus size.
    pub fn generate(bits: usize) -> Result<Self, TokenError> {
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| TokenError::KeyGenerationFailed(e.to_string()))?;
        Ok(Self::from_private_key(private))
    }

    /// Create a keypair from an existing private key.
    pub fn from_private_key(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self { private, public }
    }

    /// Parse a PEM-encoded private key (PKCS#8, or PKCS#1 `RSA PRIVATE KEY`).
    pub fn from_private_key_pem(pem: &str) -> Result<Self, TokenError> {
        let pem = pem.trim();
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|pkcs8_err| {
                RsaPrivateKey::from_pkcs1_pem(pem).map_err(|_| pkcs8_err)
            })
            .map_err(|e| TokenError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_private_key(private))
    }

    /// The private key.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// The public key.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// The private key as PKCS#8 PEM.
    pub fn private_key_pem(&self) -> Result<String, TokenError> {
        self.private
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| TokenError::InvalidPrivateKey(e.to_string()))
    }

    /// The public key as SPKI PEM.
    pub fn public_key_pem(&self) -> Result<String, TokenError> {
        public_key_to_pem(&self.public)
    }

    /// Save the keypair to PEM files.
    pub fn save_to_files(
        &self,
        private_key_path: &Path,
        public_key_path: &Path,
    ) -> Result<(), TokenError> {
        std::fs::write(private_key_path, self.private_key_pem()?)?;
        std::fs::write(public_key_path, self.public_key_pem()?)?;
        Ok(())
    }

    /// Load a keypair from a private key file.
    pub fn load_from_file(private_key_path: &Path) -> Result<Self, TokenError> {
        let pem = std::fs::read_to_string(private_key_path)?;
        Self::from_private_key_pem(&pem)
    }

    /// Load a keypair from a private key file, checking it against a public key file.
    pub fn load_from_files(
        private_key_path: &Path,
        public_key_path: &Path,
    ) -> Result<Self, TokenError> {
        let keypair = Self::load_from_file(private_key_path)?;
        let public = load_public_key_file(public_key_path)?;
        if public != keypair.public {
            return Err(TokenError::KeyMismatch);
        }
        Ok(keypair)
    }
}

impl KeyProvider for KeyPair {
    fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    fn private_key(&self) -> Option<&RsaPrivateKey> {
        Some(&self.private)
    }
}

/// Public key only, for issuer-side deployments.
impl KeyProvider for RsaPublicKey {
    fn public_key(&self) -> &RsaPublicKey {
        self
    }

    fn private_key(&self) -> Option<&RsaPrivateKey> {
        None
    }
}

/// Parse a PEM-encoded SPKI public key.
pub fn load_public_key_pem(pem: &str) -> Result<RsaPublicKey, TokenError> {
    RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| TokenError::InvalidPublicKey(e.to_string()))
}

/// Load a public key from a PEM file.
pub fn load_public_key_file(path: &Path) -> Result<RsaPublicKey, TokenError> {
    let pem = std::fs::read_to_string(path)?;
    load_public_key_pem(&pem)
}

/// Encode a public key as SPKI PEM.
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<String, TokenError> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| TokenError::InvalidPublicKey(e.to_string()))
}

/// Resolve key material from configuration.
///
/// A private key yields a full [`KeyPair`] (checked against the public key
/// when one is also configured). A public key alone yields an issuer-only
/// provider.
pub fn load_key_provider(config: &KeyConfig) -> Result<Arc<dyn KeyProvider>, TokenError> {
    let private_pem = config.resolve_private_key()?;
    let public_pem = config.resolve_public_key()?;

    match (private_pem, public_pem) {
        (Some(private_pem), public_pem) => {
            let keypair = KeyPair::from_private_key_pem(&private_pem)?;
            if let Some(public_pem) = public_pem {
                if load_public_key_pem(&public_pem)? != keypair.public {
                    return Err(TokenError::KeyMismatch);
                }
            }
            tracing::info!("Loaded RSA keypair for token validation");
            Ok(Arc::new(keypair))
        }
        (None, Some(public_pem)) => {
            let public = load_public_key_pem(&public_pem)?;
            tracing::info!("Loaded RSA public key; token validation disabled");
            Ok(Arc::new(public))
        }
        (None, None) => Err(TokenError::MissingKeyMaterial),
    }
}
