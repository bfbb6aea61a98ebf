//! Error types for the token crate.

use thiserror::Error;

/// Errors that can occur while issuing or validating identity tokens.
///
/// The variants are precise so that server-side logs and audit records can
/// tell failures apart. Callers facing an untrusted client must collapse the
/// validation variants into one outcome; see [`FailureKind::is_unauthorized`].
#[derive(Debug, Error)]
pub enum TokenError {
    /// The subject cannot be carried in a token.
    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    /// The token is not valid base64 or has the wrong ciphertext length.
    #[error("malformed token")]
    Malformed,

    /// The ciphertext failed the padding check on decryption.
    #[error("unauthorized or corrupted identity transfer")]
    Corrupted,

    /// The decrypted payload is not `<subject>|<millis>`.
    #[error("unauthorized transfer format")]
    BadFormat,

    /// The token is older than validity plus skew.
    #[error("the transfer link has expired")]
    Expired { age_ms: i64 },

    /// The token claims to be issued further in the future than the skew allows.
    #[error("invalid link timestamp")]
    NotYetValid { age_ms: i64 },

    /// The private key is required but not loaded.
    #[error("no private key available for token validation")]
    MissingPrivateKey,

    /// No key material could be resolved.
    #[error("no key material configured")]
    MissingKeyMaterial,

    /// Failed to generate a keypair.
    #[error("failed to generate keypair: {0}")]
    KeyGenerationFailed(String),

    /// Failed to parse a private key.
    #[error("failed to parse private key: {0}")]
    InvalidPrivateKey(String),

    /// Failed to parse a public key.
    #[error("failed to parse public key: {0}")]
    InvalidPublicKey(String),

    /// The configured public key does not belong to the private key.
    #[error("public key does not match private key")]
    KeyMismatch,

    /// IO error (reading/writing keys).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unexpected failure in the cryptographic primitives.
    #[error("internal validation failure")]
    Internal(String),
}

/// Coarse classification of a token failure, stable for audit tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    MalformedInput,
    Corrupted,
    BadFormat,
    Expired,
    NotYetValid,
    Internal,
}

impl FailureKind {
    /// Stable machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed_input",
            Self::Corrupted => "corrupted",
            Self::BadFormat => "bad_format",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::Internal => "internal",
        }
    }

    /// Whether this failure is reported to the client as "unauthorized".
    ///
    /// Everything except internal failures; the client never learns which.
    pub fn is_unauthorized(&self) -> bool {
        !matches!(self, Self::Internal)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TokenError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidSubject(_) | Self::Malformed => FailureKind::MalformedInput,
            Self::Corrupted => FailureKind::Corrupted,
            Self::BadFormat => FailureKind::BadFormat,
            Self::Expired { .. } => FailureKind::Expired,
            Self::NotYetValid { .. } => FailureKind::NotYetValid,
            _ => FailureKind::Internal,
        }
    }
}
