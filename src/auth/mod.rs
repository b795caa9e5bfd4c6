//! Credential registration, login, and token revocation core.
//!
//! [`AuthService`] owns the sharded credential store, the Argon2 hashing
//! service (with its optional deferred worker pool), the verification
//! cache, the token signer, and the issuance deduplicator. It is built once
//! at startup and handed to the HTTP handlers behind an `Arc`.

mod cache;
mod error;
mod flight;
mod password;
mod pool;
mod store;
mod token;

pub use cache::VerificationCache;
pub use error::AuthError;
pub use flight::Singleflight;
pub use password::{HashJob, HashWorkerPool, PasswordService};
pub use pool::{Pool, PoolGuard};
pub use store::CredentialStore;
pub use token::{Claims, TokenSigner};

use anyhow::{Context, Result};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TOKEN_LIFETIME_SECONDS: u64 = 60 * 60;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 30;
const DEFAULT_QUEUE_DEPTH: usize = 1024;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_lifetime: Duration,
    cache_ttl: Duration,
    deferred_hashing: bool,
    hash_workers: usize,
    queue_depth: usize,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_lifetime: Duration::from_secs(DEFAULT_TOKEN_LIFETIME_SECONDS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            deferred_hashing: false,
            hash_workers: 0,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    #[must_use]
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Defer registration hashing to the worker pool.
    ///
    /// The caller gets its token before the record is committed; a login
    /// immediately after registering may transiently miss. Visibility is
    /// eventual, bounded by one queued hash computation.
    #[must_use]
    pub fn with_deferred_hashing(mut self, deferred: bool) -> Self {
        self.deferred_hashing = deferred;
        self
    }

    /// Worker threads for deferred hashing; `0` sizes the pool to the
    /// available parallelism.
    #[must_use]
    pub fn with_hash_workers(mut self, workers: usize) -> Self {
        self.hash_workers = workers;
        self
    }

    #[must_use]
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    #[must_use]
    pub fn token_lifetime(&self) -> Duration {
        self.token_lifetime
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[must_use]
    pub fn deferred_hashing(&self) -> bool {
        self.deferred_hashing
    }

    fn effective_workers(&self) -> usize {
        if self.hash_workers > 0 {
            return self.hash_workers;
        }
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(4)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AuthService {
    store: Arc<CredentialStore>,
    passwords: Arc<PasswordService>,
    cache: VerificationCache,
    tokens: TokenSigner,
    flight: Singleflight<String, Result<String, AuthError>>,
    workers: Option<HashWorkerPool>,
}

impl AuthService {
    /// Build the service. The signing key must be present before the first
    /// issue/verify call and is fixed for the process lifetime; a missing
    /// key is the one fatal startup condition.
    pub fn new(signing_key: &SecretString, config: &AuthConfig) -> Result<Self> {
        let tokens = TokenSigner::new(
            signing_key.expose_secret().as_bytes(),
            config.token_lifetime,
        )
        .context("signing key rejected")?;

        let store = Arc::new(CredentialStore::new());
        let passwords = Arc::new(PasswordService::new());

        let workers = if config.deferred_hashing {
            let pool = HashWorkerPool::spawn(
                config.effective_workers(),
                config.queue_depth,
                Arc::clone(&passwords),
                Arc::clone(&store),
            )
            .context("failed to spawn hashing workers")?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            store,
            passwords,
            cache: VerificationCache::new(config.cache_ttl),
            tokens,
            flight: Singleflight::new(),
            workers,
        })
    }

    /// Register a new account and issue its first token.
    pub async fn register(&self, identifier: &str, secret: &str) -> Result<String, AuthError> {
        let identifier = normalize_identifier(identifier);
        if !valid_identifier(&identifier) || secret.is_empty() {
            return Err(AuthError::BadInput);
        }

        if let Some(workers) = &self.workers {
            if self.store.contains(&identifier) {
                return Err(AuthError::AlreadyExists);
            }
            let job = HashJob {
                identifier: identifier.clone(),
                secret: secret.to_string(),
            };
            if let Err(job) = workers.try_enqueue(job) {
                // Queue full: absorb the cost inline rather than shedding
                // the registration.
                debug!(identifier = %job.identifier, "hash queue full, hashing inline");
                self.hash_and_insert(&job.identifier, &job.secret)?;
            }
        } else {
            self.hash_and_insert(&identifier, secret)?;
        }

        self.issue_deduped(identifier).await
    }

    /// Authenticate an attempt and issue a token on success.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<String, AuthError> {
        let identifier = normalize_identifier(identifier);
        if !valid_identifier(&identifier) || secret.is_empty() {
            return Err(AuthError::BadInput);
        }

        let Some(stored) = self.store.get(&identifier) else {
            return Err(AuthError::InvalidCredentials);
        };

        let valid = match self.cache.lookup(&identifier, secret) {
            Some(valid) => valid,
            None => {
                let valid = self.passwords.verify(&stored, secret)?;
                self.cache.store(&identifier, secret, valid);
                valid
            }
        };
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_deduped(identifier).await
    }

    /// Verify a bearer token and delete the account it names.
    ///
    /// Deletion is idempotent and does not invalidate other outstanding
    /// tokens for the identifier; each remains valid until its own expiry.
    pub fn revoke(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.tokens.verify(token)?;
        self.store.delete(&claims.email);
        self.cache.invalidate(&claims.email);
        Ok(claims)
    }

    /// Verify a bearer token without touching any account state.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify(token)
    }

    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    #[must_use]
    pub fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    fn hash_and_insert(&self, identifier: &str, secret: &str) -> Result<(), AuthError> {
        let hashed = self.passwords.hash(secret)?;
        if !self.store.insert_if_absent(identifier, hashed) {
            return Err(AuthError::AlreadyExists);
        }
        Ok(())
    }

    /// Issue a token, collapsing a concurrent burst for the same identifier
    /// into one signing operation.
    async fn issue_deduped(&self, identifier: String) -> Result<String, AuthError> {
        self.flight
            .run(identifier.clone(), || async {
                self.tokens.issue(&identifier)
            })
            .await
    }
}

/// Identifiers are trimmed but case-sensitive: `A@x.com` and `a@x.com` are
/// distinct records.
fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_string()
}

/// Basic email-shape check on already-normalized input.
fn valid_identifier(identifier: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(identifier))
}
