//! Stateless freshness window for identity tokens.

use crate::error::TokenError;
use handoff_core::TokenConfig;
use std::time::Duration;

/// Accepts a token while `-skew <= now - issued_at <= validity + skew`.
///
/// Both bounds are inclusive. Older tokens are [`TokenError::Expired`];
/// tokens issued further than `skew` in the future are
/// [`TokenError::NotYetValid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    validity_ms: i64,
    skew_ms: i64,
}

impl FreshnessPolicy {
    pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(3 * 60);

    pub fn new(validity: Duration, clock_skew: Duration) -> Self {
        Self {
            validity_ms: duration_millis(validity),
            skew_ms: duration_millis(clock_skew),
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(config.validity(), config.clock_skew())
    }

    /// Oldest accepted age, `validity + skew`, in milliseconds.
    pub fn max_age_ms(&self) -> i64 {
        self.validity_ms.saturating_add(self.skew_ms)
    }

    /// Furthest accepted future offset, `skew`, in milliseconds.
    pub fn max_future_ms(&self) -> i64 {
        self.skew_ms
    }

    pub fn check(&self, issued_at_millis: i64, now_millis: i64) -> Result<(), TokenError> {
        let age_ms = now_millis.saturating_sub(issued_at_millis);
        if age_ms > self.max_age_ms() {
            return Err(TokenError::Expired { age_ms });
        }
        if age_ms < -self.skew_ms {
            return Err(TokenError::NotYetValid { age_ms });
        }
        Ok(())
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VALIDITY, Self::DEFAULT_CLOCK_SKEW)
    }
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
