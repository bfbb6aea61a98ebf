//! # handoff-token
//!
//! Bounded-lifetime identity tokens for handing a subject across a trust
//! boundary without re-authentication.
//!
//! This crate provides functionality for:
//! - Generating and loading RSA keypairs (PEM)
//! - Encoding a subject id and issue time into an opaque, URL-safe token
//! - Decoding a token and enforcing a stateless freshness window
//! - Classifying every failure for audit without leaking it to clients
//!
//! ## Token Lifecycle
//!
//! | Step | Side | Needs |
//! |------|------|-------|
//! | `encode(subject)` | Issuer (system of record) | Public key |
//! | `decode(token)` | Validator (rendering service) | Private key |
//!
//! A token is accepted while its age lies within
//! `[-clock_skew, validity + clock_skew]` (defaults: 3 and 5 minutes).
//! Nothing is stored server-side; issuer and validator only share the key
//! pair and roughly agreeing clocks.

pub mod error;
pub mod freshness;
pub mod keys;
pub mod payload;
pub mod token;

pub use error::{FailureKind, TokenError};
pub use freshness::FreshnessPolicy;
pub use keys::{KeyPair, KeyProvider, load_key_provider};
pub use payload::{IdentityPayload, SEPARATOR};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
pub use token::{TokenIssuer, TokenValidator, decode_at, encode_at};
