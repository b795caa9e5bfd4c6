//! Short-TTL memoization of credential comparisons.
//!
//! Recomputing Argon2 is the most expensive step of the login path. This
//! cache remembers the last attempted secret per identifier and whether it
//! matched, so repeated identical attempts inside the TTL window skip the
//! full comparison. Caching a failure fast-paths repeated wrong guesses of
//! the same text; any different candidate misses and falls through to a real
//! comparison, so only the correct secret can ever produce a success.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

struct CacheEntry {
    secret: String,
    valid: bool,
    expires_at: Instant,
}

pub struct VerificationCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl VerificationCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the memoized outcome for this exact (identifier, secret) pair.
    ///
    /// `None` means the caller must run a full comparison: no entry, entry
    /// expired (evicted here), or the attempted secret differs from the one
    /// cached.
    #[must_use]
    pub fn lookup(&self, identifier: &str, candidate: &str) -> Option<bool> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(identifier) {
                None => return None,
                Some(entry) if entry.expires_at > Instant::now() => {
                    return (entry.secret == candidate).then_some(entry.valid);
                }
                Some(_) => {}
            }
        }

        // Expired: evict lazily, re-checking under the write lock.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries
            .get(identifier)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(identifier);
        }
        None
    }

    /// Record the outcome of a completed comparison, success or failure,
    /// replacing any previous entry for the identifier.
    pub fn store(&self, identifier: &str, candidate: &str, valid: bool) {
        let entry = CacheEntry {
            secret: candidate.to_string(),
            valid,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identifier.to_string(), entry);
    }

    /// Drop any entry for the identifier.
    pub fn invalidate(&self, identifier: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier);
    }
}
