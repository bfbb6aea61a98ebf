//! Token encoding and validation.
//!
//! Wire format: URL-safe base64 (no padding) of the RSA PKCS#1 v1.5
//! ciphertext of the UTF-8 string `<subject>|<epoch millis>`.

use crate::error::TokenError;
use crate::freshness::FreshnessPolicy;
use crate::keys::KeyProvider;
use crate::payload::IdentityPayload;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use handoff_core::{SharedClock, SystemClock};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use std::sync::Arc;

/// PKCS#1 v1.5 encryption overhead in bytes.
const PKCS1_OVERHEAD: usize = 11;

/// URL-safe alphabet; emits no padding, tolerates padding on input.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encrypt `subject_id` issued at `issued_at_millis` into a token.
pub fn encode_at(
    subject_id: &str,
    public_key: &RsaPublicKey,
    issued_at_millis: i64,
) -> Result<String, TokenError> {
    let payload = IdentityPayload::new(subject_id, issued_at_millis)?;
    let plaintext = payload.to_wire();

    let max_len = public_key.size().saturating_sub(PKCS1_OVERHEAD);
    if plaintext.len() > max_len {
        return Err(TokenError::InvalidSubject(format!(
            "subject id too long for a {}-bit key",
            public_key.size() * 8
        )));
    }

    let ciphertext = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext.as_bytes())
        .map_err(|e| {
            tracing::error!(error = %e, "Token encryption failed");
            TokenError::Internal(e.to_string())
        })?;

    Ok(TOKEN_ENGINE.encode(ciphertext))
}

/// Decrypt a token and check its freshness against `now_millis`.
pub fn decode_at(
    token: &str,
    private_key: &RsaPrivateKey,
    policy: &FreshnessPolicy,
    now_millis: i64,
) -> Result<IdentityPayload, TokenError> {
    let ciphertext = TOKEN_ENGINE
        .decode(token.trim())
        .map_err(|_| TokenError::Malformed)?;

    if ciphertext.len() != private_key.size() {
        return Err(TokenError::Malformed);
    }

    let plaintext = private_key
        .decrypt(Pkcs1v15Encrypt, &ciphertext)
        .map_err(|e| match e {
            rsa::Error::Decryption => TokenError::Corrupted,
            other => {
                tracing::error!(error = %other, "Unexpected token decryption failure");
                TokenError::Internal(other.to_string())
            }
        })?;

    let raw = String::from_utf8(plaintext).map_err(|_| TokenError::BadFormat)?;
    let payload = IdentityPayload::parse(&raw)?;
    policy.check(payload.issued_at_millis(), now_millis)?;
    Ok(payload)
}

/// Issues identity tokens with the public key.
pub struct TokenIssuer {
    keys: Arc<dyn KeyProvider>,
    clock: SharedClock,
}

impl TokenIssuer {
    /// Create an issuer using the system clock.
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self::with_clock(keys, SystemClock::shared())
    }

    pub fn with_clock(keys: Arc<dyn KeyProvider>, clock: SharedClock) -> Self {
        Self { keys, clock }
    }

    /// Encode a subject into a token stamped with the current time.
    pub fn encode(&self, subject_id: &str) -> Result<String, TokenError> {
        encode_at(subject_id, self.keys.public_key(), self.clock.now_millis())
    }
}

/// Validates identity tokens with the private key.
pub struct TokenValidator {
    keys: Arc<dyn KeyProvider>,
    policy: FreshnessPolicy,
    clock: SharedClock,
}

impl TokenValidator {
    /// Create a validator using the system clock.
    ///
    /// Fails when the provider holds no private key.
    pub fn new(keys: Arc<dyn KeyProvider>, policy: FreshnessPolicy) -> Result<Self, TokenError> {
        Self::with_clock(keys, policy, SystemClock::shared())
    }

    pub fn with_clock(
        keys: Arc<dyn KeyProvider>,
        policy: FreshnessPolicy,
        clock: SharedClock,
    ) -> Result<Self, TokenError> {
        if keys.private_key().is_none() {
            return Err(TokenError::MissingPrivateKey);
        }
        Ok(Self {
            keys,
            policy,
            clock,
        })
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    /// Decode a token into its full payload.
    pub fn validate(&self, token: &str) -> Result<IdentityPayload, TokenError> {
        let private_key = self.keys.private_key().ok_or(TokenError::MissingPrivateKey)?;
        let result = decode_at(token, private_key, &self.policy, self.clock.now_millis());
        if let Err(e) = &result {
            tracing::debug!(kind = %e.kind(), "Identity token rejected");
        }
        result
    }

    /// Decode a token into its subject id.
    pub fn decode(&self, token: &str) -> Result<String, TokenError> {
        self.validate(token).map(IdentityPayload::into_subject_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::keys::{DEFAULT_KEY_BITS, KeyPair};
    use handoff_core::ManualClock;
    use std::sync::OnceLock;

    const MINUTE: i64 = 60_000;
    const T0: i64 = 1_700_000_000_000;

    fn keypair() -> &'static KeyPair {
        static KEYS: OnceLock<KeyPair> = OnceLock::new();
        KEYS.get_or_init(|| KeyPair::generate(DEFAULT_KEY_BITS).unwrap())
    }

    fn provider() -> Arc<dyn KeyProvider> {
        Arc::new(keypair().clone())
    }

    fn encrypt_raw(plaintext: &[u8]) -> String {
        let ciphertext = keypair()
            .public_key()
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .unwrap();
        TOKEN_ENGINE.encode(ciphertext)
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let token = encode_at("888999", keypair().public_key(), T0).unwrap();
        let payload =
            decode_at(&token, keypair().private_key(), &FreshnessPolicy::default(), T0).unwrap();
        assert_eq!(payload.subject_id(), "888999");
        assert_eq!(payload.issued_at_millis(), T0);
    }

    #[test]
    fn test_token_is_url_safe_unpadded() {
        let token = encode_at("100205", keypair().public_key(), T0).unwrap();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        // 256-byte ciphertext encodes to 342 unpadded characters
        assert_eq!(token.len(), 342);
    }

    #[test]
    fn test_padded_token_accepted() {
        let token = encode_at("100205", keypair().public_key(), T0).unwrap();
        let padded = format!("{token}==");
        let payload =
            decode_at(&padded, keypair().private_key(), &FreshnessPolicy::default(), T0).unwrap();
        assert_eq!(payload.subject_id(), "100205");
    }

    #[test]
    fn test_encryption_is_randomized() {
        let a = encode_at("100205", keypair().public_key(), T0).unwrap();
        let b = encode_at("100205", keypair().public_key(), T0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_handoff_scenario() {
        let clock = Arc::new(ManualClock::new(T0));
        let issuer = TokenIssuer::with_clock(provider(), clock.clone());
        let validator =
            TokenValidator::with_clock(provider(), FreshnessPolicy::default(), clock.clone())
                .unwrap();

        let token = issuer.encode("100205").unwrap();

        clock.set(T0 + 4 * MINUTE);
        assert_eq!(validator.decode(&token).unwrap(), "100205");

        clock.set(T0 + 9 * MINUTE);
        let err = validator.decode(&token).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Expired);
    }

    #[test]
    fn test_future_token_rejected() {
        let token = encode_at("100205", keypair().public_key(), T0 + 5 * MINUTE).unwrap();
        let err = decode_at(&token, keypair().private_key(), &FreshnessPolicy::default(), T0)
            .unwrap_err();
        assert!(matches!(err, TokenError::NotYetValid { .. }));
    }

    #[test]
    fn test_boundaries_through_codec() {
        let policy = FreshnessPolicy::default();
        let max_age = policy.max_age_ms();
        let skew = policy.max_future_ms();
        let private = keypair().private_key();
        let public = keypair().public_key();

        let at_max_age = encode_at("u", public, T0 - max_age).unwrap();
        assert!(decode_at(&at_max_age, private, &policy, T0).is_ok());
        let past_max_age = encode_at("u", public, T0 - max_age - 1).unwrap();
        assert!(decode_at(&past_max_age, private, &policy, T0).is_err());

        let at_skew = encode_at("u", public, T0 + skew).unwrap();
        assert!(decode_at(&at_skew, private, &policy, T0).is_ok());
        let past_skew = encode_at("u", public, T0 + skew + 1).unwrap();
        assert!(decode_at(&past_skew, private, &policy, T0).is_err());
    }

    #[test]
    fn test_bit_flips_never_yield_wrong_subject() {
        let token = encode_at("100205", keypair().public_key(), T0).unwrap();
        let ciphertext = TOKEN_ENGINE.decode(&token).unwrap();

        for byte in [0usize, 1, 17, 128, 255] {
            for bit in [0u8, 3, 7] {
                let mut tampered = ciphertext.clone();
                tampered[byte] ^= 1 << bit;
                let result = decode_at(
                    &TOKEN_ENGINE.encode(&tampered),
                    keypair().private_key(),
                    &FreshnessPolicy::default(),
                    T0,
                );
                match result {
                    Ok(payload) => panic!(
                        "tampered token decoded to subject {:?}",
                        payload.subject_id()
                    ),
                    Err(e) => assert!(
                        matches!(
                            e.kind(),
                            FailureKind::Corrupted
                                | FailureKind::MalformedInput
                                | FailureKind::BadFormat
                        ),
                        "unexpected failure {e:?}"
                    ),
                }
            }
        }
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let private = keypair().private_key();
        let policy = FreshnessPolicy::default();
        for token in ["NotAValidToken123", "", "!!!!", "a b c"] {
            let err = decode_at(token, private, &policy, T0).unwrap_err();
            assert_eq!(err.kind(), FailureKind::MalformedInput, "{token:?}");
        }
    }

    #[test]
    fn test_payload_without_separator_is_bad_format() {
        let token = encrypt_raw(b"BrokenPayloadNoSeparator");
        let err = decode_at(&token, keypair().private_key(), &FreshnessPolicy::default(), T0)
            .unwrap_err();
        assert!(matches!(err, TokenError::BadFormat));
    }

    #[test]
    fn test_non_utf8_payload_is_bad_format() {
        let token = encrypt_raw(&[0xff, 0xfe, b'|', b'1']);
        let err = decode_at(&token, keypair().private_key(), &FreshnessPolicy::default(), T0)
            .unwrap_err();
        assert!(matches!(err, TokenError::BadFormat));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let other = KeyPair::generate(DEFAULT_KEY_BITS).unwrap();
        let token = encode_at("100205", other.public_key(), T0).unwrap();
        let err = decode_at(&token, keypair().private_key(), &FreshnessPolicy::default(), T0)
            .unwrap_err();
        assert!(err.kind().is_unauthorized());
        assert_ne!(err.kind(), FailureKind::Expired);
    }

    #[test]
    fn test_invalid_subjects_rejected_on_encode() {
        let public = keypair().public_key();
        assert!(matches!(
            encode_at("a|b", public, T0),
            Err(TokenError::InvalidSubject(_))
        ));
        assert!(matches!(
            encode_at("", public, T0),
            Err(TokenError::InvalidSubject(_))
        ));
        let long = "x".repeat(300);
        assert!(matches!(
            encode_at(&long, public, T0),
            Err(TokenError::InvalidSubject(_))
        ));
    }

    #[test]
    fn test_validator_requires_private_key() {
        let public_only: Arc<dyn KeyProvider> = Arc::new(keypair().public_key().clone());
        assert!(matches!(
            TokenValidator::new(public_only.clone(), FreshnessPolicy::default()),
            Err(TokenError::MissingPrivateKey)
        ));
        // Issuing works with the public key alone.
        assert!(TokenIssuer::new(public_only).encode("100205").is_ok());
    }
}
