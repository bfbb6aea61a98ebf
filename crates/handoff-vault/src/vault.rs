//! The one-time artifact vault.
//!
//! ## Entry Lifecycle
//!
//! ```text
//!            store()
//!               |
//!               v
//!           [Pending] --consume() before expiry--> [Consumed]
//!               |
//!               +--expiry (sweep or expired lookup)--> [Purged]
//! ```
//!
//! Both terminal states remove the entry from the map, so no path leads back
//! to `Pending`. `consume()` removes the entry first and checks expiry
//! second, in a single map operation; two racing consumers can never both
//! receive the payload, and correctness never depends on a sweep having run.

use crate::cipher::{IV_LEN, KEY_LEN, SealedArtifact};
use crate::error::VaultError;
use crate::handle::{VaultHandle, log_prefix};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use handoff_core::{SharedClock, SystemClock, VaultConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An encrypted artifact awaiting its single retrieval.
///
/// Key and IV are zeroed when the entry is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ArtifactEntry {
    #[zeroize(skip)]
    ciphertext: Vec<u8>,
    iv: [u8; IV_LEN],
    key: [u8; KEY_LEN],
    #[zeroize(skip)]
    expires_at_millis: i64,
}

impl ArtifactEntry {
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub fn expires_at_millis(&self) -> i64 {
        self.expires_at_millis
    }

    /// An entry is live for `[stored_at, stored_at + ttl)`.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at_millis
    }

    /// Take the ciphertext out of the entry.
    pub fn into_ciphertext(mut self) -> Vec<u8> {
        std::mem::take(&mut self.ciphertext)
    }
}

impl std::fmt::Debug for ArtifactEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactEntry")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("expires_at_millis", &self.expires_at_millis)
            .finish_non_exhaustive()
    }
}

/// Counters describing vault activity since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultStats {
    /// Entries currently held.
    pub live: usize,
    /// Entries ever stored.
    pub stored: u64,
    /// Entries delivered by `consume()`.
    pub consumed: u64,
    /// Entries removed because they had expired, by lookup or sweep.
    pub expired: u64,
    /// Entries dropped by `drain()`.
    pub drained: u64,
}

#[derive(Default)]
struct Counters {
    stored: AtomicU64,
    consumed: AtomicU64,
    expired: AtomicU64,
    drained: AtomicU64,
}

/// Concurrency-safe map from single-use handle to encrypted artifact.
pub struct ArtifactVault {
    entries: DashMap<String, ArtifactEntry>,
    clock: SharedClock,
    default_ttl: Duration,
    purge_on_store: bool,
    counters: Counters,
}

impl ArtifactVault {
    /// Default lifetime of an unconsumed entry.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

    /// Create a vault on the system clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, SystemClock::shared())
    }

    pub fn with_clock(default_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            default_ttl,
            purge_on_store: true,
            counters: Counters::default(),
        }
    }

    pub fn from_config(config: &VaultConfig, clock: SharedClock) -> Self {
        Self::with_clock(config.ttl(), clock).purge_on_store(config.purge_on_store)
    }

    /// Whether `store()` sweeps expired entries after inserting.
    pub fn purge_on_store(mut self, enabled: bool) -> Self {
        self.purge_on_store = enabled;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert an entry under a fresh handle, expiring `ttl` from now.
    pub fn store(
        &self,
        ciphertext: Vec<u8>,
        iv: [u8; IV_LEN],
        key: [u8; KEY_LEN],
        ttl: Duration,
    ) -> VaultHandle {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = ArtifactEntry {
            ciphertext,
            iv,
            key,
            expires_at_millis: self.clock.now_millis().saturating_add(ttl_ms),
        };
        let expires_at_millis = entry.expires_at_millis;

        let handle = loop {
            let handle = VaultHandle::generate();
            match self.entries.entry(handle.as_str().to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                    break handle;
                }
                Entry::Occupied(_) => {
                    tracing::warn!("Vault handle collision, generating a new handle");
                }
            }
        };
        self.counters.stored.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            handle = %handle.log_prefix(),
            expires_at_millis,
            "Artifact stored"
        );

        if self.purge_on_store {
            self.purge_expired();
        }

        handle
    }

    /// Store a sealed artifact with the default TTL.
    pub fn store_sealed(&self, mut sealed: SealedArtifact) -> VaultHandle {
        let ciphertext = std::mem::take(&mut sealed.ciphertext);
        self.store(ciphertext, sealed.iv, sealed.key, self.default_ttl)
    }

    /// Remove and return the entry for `handle` if it has not expired.
    ///
    /// Unknown, already consumed and expired handles all yield
    /// [`VaultError::NotFound`]. An expired entry is removed by the lookup.
    pub fn consume(&self, handle: &str) -> Result<ArtifactEntry, VaultError> {
        let now = self.clock.now_millis();
        match self.entries.remove(handle) {
            Some((_, entry)) if !entry.is_expired_at(now) => {
                self.counters.consumed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(handle = %log_prefix(handle), "Artifact consumed");
                Ok(entry)
            }
            Some(_) => {
                self.counters.expired.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(handle = %log_prefix(handle), "Expired artifact removed on lookup");
                Err(VaultError::NotFound)
            }
            None => Err(VaultError::NotFound),
        }
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = 0usize;
        self.entries.retain(|_, entry| {
            let live = !entry.is_expired_at(now);
            if !live {
                removed += 1;
            }
            live
        });

        if removed > 0 {
            self.counters
                .expired
                .fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(removed, "Purged expired artifacts");
        }
        removed
    }

    /// Remove every entry, live or not. Used at shutdown.
    pub fn drain(&self) -> usize {
        let mut removed = 0usize;
        self.entries.retain(|_, _| {
            removed += 1;
            false
        });
        self.counters
            .drained
            .fetch_add(removed as u64, Ordering::Relaxed);
        tracing::info!(removed, "Vault drained");
        removed
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> VaultStats {
        VaultStats {
            live: self.entries.len(),
            stored: self.counters.stored.load(Ordering::Relaxed),
            consumed: self.counters.consumed.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
            drained: self.counters.drained.load(Ordering::Relaxed),
        }
    }
}

impl Default for ArtifactVault {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{open, seal};
    use handoff_core::ManualClock;
    use std::sync::Arc;
    use std::sync::Barrier;

    const T0: i64 = 1_700_000_000_000;

    fn manual_vault() -> (Arc<ManualClock>, ArtifactVault) {
        let clock = Arc::new(ManualClock::new(T0));
        let vault = ArtifactVault::with_clock(ArtifactVault::DEFAULT_TTL, clock.clone())
            .purge_on_store(false);
        (clock, vault)
    }

    #[test]
    fn test_store_then_consume_once() {
        let (_, vault) = manual_vault();
        let handle = vault.store(
            b"bytes".to_vec(),
            [1; IV_LEN],
            [2; KEY_LEN],
            Duration::from_millis(30_000),
        );

        let entry = vault.consume(handle.as_str()).unwrap();
        assert_eq!(entry.ciphertext(), b"bytes");
        assert_eq!(entry.iv(), &[1; IV_LEN]);
        assert_eq!(entry.key(), &[2; KEY_LEN]);

        assert_eq!(vault.consume(handle.as_str()).unwrap_err(), VaultError::NotFound);
        assert!(vault.is_empty());
    }

    #[test]
    fn test_unknown_handle_not_found() {
        let (_, vault) = manual_vault();
        assert_eq!(vault.consume("never-issued").unwrap_err(), VaultError::NotFound);
        assert_eq!(vault.consume("").unwrap_err(), VaultError::NotFound);
    }

    #[test]
    fn test_expiry_enforced_without_sweep() {
        let (clock, vault) = manual_vault();
        let handle = vault.store(vec![7; 32], [0; IV_LEN], [0; KEY_LEN], Duration::from_millis(1));

        clock.advance(2);
        assert_eq!(vault.consume(handle.as_str()).unwrap_err(), VaultError::NotFound);
        // The expired lookup removed the entry even though nothing swept.
        assert!(vault.is_empty());
        assert_eq!(vault.stats().expired, 1);
        assert_eq!(vault.stats().consumed, 0);
    }

    #[test]
    fn test_ttl_boundary() {
        let (clock, vault) = manual_vault();
        let early = vault.store(vec![1], [0; IV_LEN], [0; KEY_LEN], Duration::from_millis(100));
        let late = vault.store(vec![2], [0; IV_LEN], [0; KEY_LEN], Duration::from_millis(100));

        clock.advance(99);
        assert!(vault.consume(early.as_str()).is_ok());

        clock.advance(1);
        assert_eq!(vault.consume(late.as_str()).unwrap_err(), VaultError::NotFound);
    }

    #[test]
    fn test_expiry_on_system_clock() {
        let vault = ArtifactVault::default().purge_on_store(false);
        let handle =
            vault.store(vec![1, 2, 3], [0; IV_LEN], [0; KEY_LEN], Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(vault.consume(handle.as_str()).unwrap_err(), VaultError::NotFound);
    }

    #[test]
    fn test_purge_expired_only_removes_expired() {
        let (clock, vault) = manual_vault();
        let short = vault.store(vec![1], [0; IV_LEN], [0; KEY_LEN], Duration::from_millis(10));
        let long = vault.store(vec![2], [0; IV_LEN], [0; KEY_LEN], Duration::from_secs(30));

        clock.advance(50);
        assert_eq!(vault.purge_expired(), 1);
        assert_eq!(vault.len(), 1);
        assert_eq!(vault.consume(short.as_str()).unwrap_err(), VaultError::NotFound);
        assert!(vault.consume(long.as_str()).is_ok());
        assert_eq!(vault.purge_expired(), 0);
    }

    #[test]
    fn test_store_purges_opportunistically() {
        let clock = Arc::new(ManualClock::new(T0));
        let vault = ArtifactVault::with_clock(ArtifactVault::DEFAULT_TTL, clock.clone());

        vault.store(vec![1], [0; IV_LEN], [0; KEY_LEN], Duration::from_millis(5));
        clock.advance(10);
        vault.store(vec![2], [0; IV_LEN], [0; KEY_LEN], Duration::from_secs(30));

        assert_eq!(vault.len(), 1);
        assert_eq!(vault.stats().expired, 1);
    }

    #[test]
    fn test_drain_removes_everything() {
        let (_, vault) = manual_vault();
        let handle = vault.store(vec![1], [0; IV_LEN], [0; KEY_LEN], Duration::from_secs(30));
        vault.store(vec![2], [0; IV_LEN], [0; KEY_LEN], Duration::from_secs(30));

        assert_eq!(vault.drain(), 2);
        assert!(vault.is_empty());
        assert_eq!(vault.consume(handle.as_str()).unwrap_err(), VaultError::NotFound);
        assert_eq!(vault.stats().drained, 2);
    }

    #[test]
    fn test_store_sealed_uses_default_ttl() {
        let clock = Arc::new(ManualClock::new(T0));
        let vault = ArtifactVault::with_clock(Duration::from_secs(30), clock.clone());
        let sealed = seal(b"rendered artifact");
        let handle = vault.store_sealed(sealed);

        clock.advance(29_999);
        let entry = vault.consume(handle.as_str()).unwrap();
        assert_eq!(entry.expires_at_millis(), T0 + 30_000);
        let plaintext = open(entry.ciphertext(), entry.key(), entry.iv()).unwrap();
        assert_eq!(plaintext, b"rendered artifact");
    }

    #[test]
    fn test_consumed_entry_wipes_key_material() {
        let (_, vault) = manual_vault();
        let handle = vault.store(
            b"bytes".to_vec(),
            [7; IV_LEN],
            [9; KEY_LEN],
            ArtifactVault::DEFAULT_TTL,
        );

        let mut entry = vault.consume(handle.as_str()).unwrap();
        entry.zeroize();
        assert_eq!(entry.key(), &[0; KEY_LEN]);
        assert_eq!(entry.iv(), &[0; IV_LEN]);
        assert_eq!(entry.ciphertext(), b"bytes");

        fn wiped_on_drop<T: ZeroizeOnDrop>() {}
        wiped_on_drop::<ArtifactEntry>();
    }

    #[test]
    fn test_racing_consumers_single_winner() {
        for _ in 0..50 {
            let vault = Arc::new(ArtifactVault::default());
            let handle =
                vault.store(vec![9; 64], [0; IV_LEN], [0; KEY_LEN], Duration::from_secs(30));
            let barrier = Arc::new(Barrier::new(8));

            let workers: Vec<_> = (0..8)
                .map(|_| {
                    let vault = vault.clone();
                    let handle = handle.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        vault.consume(handle.as_str()).is_ok()
                    })
                })
                .collect();

            let winners = workers
                .into_iter()
                .map(|w| w.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
            assert_eq!(vault.stats().consumed, 1);
        }
    }

    #[test]
    fn test_concurrent_stores_get_distinct_handles() {
        let vault = Arc::new(ArtifactVault::default());
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let vault = vault.clone();
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| {
                            vault.store(vec![i], [0; IV_LEN], [0; KEY_LEN], Duration::from_secs(30))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let handles: Vec<VaultHandle> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        assert_eq!(handles.len(), 2_000);
        assert_eq!(vault.len(), 2_000);
        assert_eq!(vault.stats().stored, 2_000);

        for handle in &handles {
            assert!(vault.consume(handle.as_str()).is_ok());
        }
        assert!(vault.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_tasks_race_on_same_handle() {
        let vault = Arc::new(ArtifactVault::default());
        let handle = vault.store(
            b"payload".to_vec(),
            [3; IV_LEN],
            [4; KEY_LEN],
            Duration::from_secs(30),
        );

        let a = tokio::spawn({
            let vault = vault.clone();
            let handle = handle.clone();
            async move { vault.consume(handle.as_str()).map(|e| e.into_ciphertext()) }
        });
        let b = tokio::spawn({
            let vault = vault.clone();
            let handle = handle.clone();
            async move { vault.consume(handle.as_str()).map(|e| e.into_ciphertext()) }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let delivered: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].as_slice(), b"payload");
        assert!(results.iter().any(|r| r.as_ref().err() == Some(&VaultError::NotFound)));
    }
}
