use crate::{
    api,
    auth::{AuthConfig, AuthService},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub signing_key: SecretString,
    pub token_ttl_seconds: u64,
    pub cache_ttl_seconds: u64,
    pub deferred_hashing: bool,
    pub hash_workers: usize,
    pub queue_depth: usize,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the service cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = AuthConfig::new()
        .with_token_lifetime(Duration::from_secs(args.token_ttl_seconds))
        .with_cache_ttl(Duration::from_secs(args.cache_ttl_seconds))
        .with_deferred_hashing(args.deferred_hashing)
        .with_hash_workers(args.hash_workers)
        .with_queue_depth(args.queue_depth);

    if config.deferred_hashing() {
        info!("Deferred hashing enabled; registrations become visible once committed");
    }

    let service = Arc::new(
        AuthService::new(&args.signing_key, &config).context("Failed to build auth service")?,
    );

    api::serve(args.port, service).await
}
