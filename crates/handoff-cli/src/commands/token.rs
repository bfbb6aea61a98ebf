//! Token commands.
//!
//! `handoff token encode` - Issue a token for a subject.
//! `handoff token decode` - Decode a token and check its freshness.

use anyhow::Context;
use handoff_core::TokenConfig;
use handoff_token::keys::{load_public_key_file, load_public_key_pem};
use handoff_token::{FreshnessPolicy, KeyPair, RsaPublicKey, TokenIssuer, TokenValidator};
use std::path::Path;
use std::sync::Arc;

/// Resolve a private key from either a file path or PEM text.
///
/// The key string can be:
/// - A path to a PEM file
/// - The PEM itself (e.g., from the HANDOFF_PRIVATE_KEY env var)
fn resolve_private_key(key: Option<String>) -> anyhow::Result<KeyPair> {
    let key_str = key.context(
        "Private key not provided. Either pass --key <path> or set HANDOFF_PRIVATE_KEY env var",
    )?;

    let path = Path::new(&key_str);
    if path.exists() {
        return KeyPair::load_from_file(path)
            .with_context(|| format!("Failed to load private key from file: {}", path.display()));
    }

    KeyPair::from_private_key_pem(&key_str).context("Failed to parse private key PEM")
}

/// Resolve a public key from either a file path or PEM text.
fn resolve_public_key(key: Option<String>) -> anyhow::Result<RsaPublicKey> {
    let key_str = key.context(
        "Public key not provided. Either pass --key <path> or set HANDOFF_PUBLIC_KEY env var",
    )?;

    let path = Path::new(&key_str);
    if path.exists() {
        return load_public_key_file(path)
            .with_context(|| format!("Failed to load public key from file: {}", path.display()));
    }

    load_public_key_pem(&key_str).context("Failed to parse public key PEM")
}

/// Issue a token for `subject` stamped with the current time.
pub fn encode(public_key: Option<String>, subject: &str) -> anyhow::Result<String> {
    let public = resolve_public_key(public_key)?;
    let issuer = TokenIssuer::new(Arc::new(public));
    let token = issuer
        .encode(subject)
        .with_context(|| format!("Failed to encode token for subject '{subject}'"))?;
    Ok(token)
}

/// Decoded token, as printed by `token decode`.
#[derive(Debug)]
pub struct DecodedToken {
    pub subject: String,
    pub issued_at_millis: i64,
}

/// Decode a token with the private key and enforce the freshness window.
pub fn decode(
    private_key: Option<String>,
    token: &str,
    token_config: &TokenConfig,
) -> anyhow::Result<DecodedToken> {
    let keypair = resolve_private_key(private_key)?;
    let validator = TokenValidator::new(
        Arc::new(keypair),
        FreshnessPolicy::from_config(token_config),
    )?;

    // The operator is trusted, so the precise failure kind is shown.
    let payload = validator
        .validate(token)
        .map_err(|e| anyhow::anyhow!("Token rejected ({}): {}", e.kind(), e))?;

    Ok(DecodedToken {
        issued_at_millis: payload.issued_at_millis(),
        subject: payload.into_subject_id(),
    })
}

pub fn print_decoded(decoded: &DecodedToken) {
    println!("✔ Token is valid");
    println!("  Subject:   {}", decoded.subject);
    match chrono::DateTime::from_timestamp_millis(decoded.issued_at_millis) {
        Some(issued) => println!("  Issued at: {}", issued.to_rfc3339()),
        None => println!("  Issued at: {} ms", decoded.issued_at_millis),
    }
}
