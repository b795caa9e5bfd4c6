//! Sharded in-memory credential store.
//!
//! Identifiers are routed to one of 256 shards by their first byte, so
//! unrelated identifiers rarely contend on the same lock. Each shard is an
//! `RwLock`-guarded map: concurrent reads within a shard, exclusive writes,
//! full parallelism across shards. The store is volatile; records live for
//! the process lifetime only.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

const SHARD_COUNT: usize = 256;

type Shard = RwLock<HashMap<String, String>>;

pub struct CredentialStore {
    shards: Vec<Shard>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        shards.resize_with(SHARD_COUNT, || RwLock::new(HashMap::new()));
        Self { shards }
    }

    fn shard(&self, identifier: &str) -> &Shard {
        let index = identifier.as_bytes().first().copied().unwrap_or(0) as usize;
        &self.shards[index & (SHARD_COUNT - 1)]
    }

    /// Look up the stored hashed secret for an identifier.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<String> {
        self.shard(identifier)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identifier)
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.shard(identifier)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(identifier)
    }

    /// Insert or overwrite unconditionally.
    ///
    /// Callers owning an "already exists" pre-check must use
    /// [`insert_if_absent`](Self::insert_if_absent) instead; two racing
    /// `set` calls for a new identifier would silently overwrite each
    /// other.
    pub fn set(&self, identifier: &str, hashed_secret: String) {
        self.shard(identifier)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identifier.to_string(), hashed_secret);
    }

    /// Insert only when the identifier has no record yet.
    ///
    /// Returns `true` when this call created the record. The check and the
    /// write happen under one shard lock, so exactly one of any number of
    /// concurrent calls for the same new identifier wins.
    pub fn insert_if_absent(&self, identifier: &str, hashed_secret: String) -> bool {
        let mut shard = self
            .shard(identifier)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if shard.contains_key(identifier) {
            return false;
        }
        shard.insert(identifier.to_string(), hashed_secret);
        true
    }

    /// Remove a record. Idempotent; returns whether a record was present.
    pub fn delete(&self, identifier: &str) -> bool {
        self.shard(identifier)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier)
            .is_some()
    }

    /// Total records across all shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
