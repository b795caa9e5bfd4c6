//! Maps validated CLI matches to an action.

use crate::cli::actions::{Action, server::Args};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let signing_key = matches
        .get_one::<String>("signing-key")
        .cloned()
        .context("missing required argument: --signing-key")?;
    let token_ttl_seconds = matches
        .get_one::<u64>("token-ttl")
        .copied()
        .unwrap_or(3600);
    let cache_ttl_seconds = matches.get_one::<u64>("cache-ttl").copied().unwrap_or(30);
    let deferred_hashing = matches.get_flag("deferred-hashing");
    let hash_workers = matches.get_one::<usize>("hash-workers").copied().unwrap_or(0);
    let queue_depth = matches
        .get_one::<usize>("queue-depth")
        .copied()
        .unwrap_or(1024);

    Ok(Action::Server(Args {
        port,
        signing_key: SecretString::from(signing_key),
        token_ttl_seconds,
        cache_ttl_seconds,
        deferred_hashing,
        hash_workers,
        queue_depth,
    }))
}
