//! Adaptive password hashing and the deferred hashing worker pool.

use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString},
};
use rand::rngs::OsRng;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::{debug, error};

use super::error::AuthError;
use super::store::CredentialStore;

/// Argon2id hashing with per-call random salts.
///
/// The salt and cost parameters are embedded in the PHC output string, so
/// verification needs nothing beyond the stored hash itself. Default Argon2id
/// parameters keep a single hash in the tens-of-milliseconds range.
pub struct PasswordService {
    argon2: Argon2<'static>,
    comparisons: AtomicU64,
}

impl PasswordService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
            comparisons: AtomicU64::new(0),
        }
    }

    /// Hash a secret with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AuthError::Hashing(err.to_string()))
    }

    /// Recompute with the parameters embedded in `stored` and compare.
    ///
    /// A mismatch is `Ok(false)`, never an error; only a stored hash that
    /// fails to parse is an error.
    pub fn verify(&self, stored: &str, candidate: &str) -> Result<bool, AuthError> {
        self.comparisons.fetch_add(1, Ordering::Relaxed);
        let parsed =
            PasswordHash::new(stored).map_err(|err| AuthError::CorruptHash(err.to_string()))?;
        match self.argon2.verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(AuthError::Hashing(err.to_string())),
        }
    }

    /// Number of full comparisons performed since startup.
    ///
    /// The verification cache exists to keep this from growing on repeated
    /// identical attempts; tests assert on it.
    #[must_use]
    pub fn comparisons(&self) -> u64 {
        self.comparisons.load(Ordering::Relaxed)
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

/// A deferred registration waiting for a hashing worker.
pub struct HashJob {
    pub identifier: String,
    pub secret: String,
}

/// Bounded queue plus fixed-size pool of dedicated hashing threads.
///
/// Workers hash each job and commit it with `insert_if_absent`, so the first
/// completed job for an identifier wins and a late duplicate cannot
/// overwrite it. A registration served by this pool becomes visible in the
/// store only once its worker commits; the caller already holds its token by
/// then. That visibility window is the documented trade for not spending
/// request-handling time on Argon2.
pub struct HashWorkerPool {
    sender: SyncSender<HashJob>,
    // Keeps the queue open independent of worker lifetimes.
    _receiver: Arc<Mutex<Receiver<HashJob>>>,
}

impl HashWorkerPool {
    /// Spawn `workers` threads draining a queue of at most `depth` jobs.
    pub fn spawn(
        workers: usize,
        depth: usize,
        passwords: Arc<PasswordService>,
        store: Arc<CredentialStore>,
    ) -> io::Result<Self> {
        let (sender, receiver) = sync_channel::<HashJob>(depth);
        let receiver = Arc::new(Mutex::new(receiver));

        for n in 0..workers {
            let receiver = Arc::clone(&receiver);
            let passwords = Arc::clone(&passwords);
            let store = Arc::clone(&store);
            thread::Builder::new()
                .name(format!("hash-worker-{n}"))
                .spawn(move || run_worker(&receiver, &passwords, &store))?;
        }

        Ok(Self {
            sender,
            _receiver: receiver,
        })
    }

    /// Hand a job to the pool without blocking.
    ///
    /// Returns the job back when the queue is full (or the pool is gone) so
    /// the caller can hash inline instead.
    pub fn try_enqueue(&self, job: HashJob) -> Result<(), HashJob> {
        self.sender.try_send(job).map_err(|err| match err {
            TrySendError::Full(job) | TrySendError::Disconnected(job) => job,
        })
    }
}

fn run_worker(
    receiver: &Mutex<Receiver<HashJob>>,
    passwords: &PasswordService,
    store: &CredentialStore,
) {
    loop {
        let job = {
            let receiver = receiver.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.recv()
        };
        let Ok(job) = job else {
            // Queue closed: the pool owner is gone.
            break;
        };

        match passwords.hash(&job.secret) {
            Ok(hashed) => {
                if !store.insert_if_absent(&job.identifier, hashed) {
                    debug!(
                        identifier = %job.identifier,
                        "deferred hash discarded, record already present"
                    );
                }
            }
            Err(err) => error!(identifier = %job.identifier, "deferred hash failed: {err}"),
        }
    }
}
