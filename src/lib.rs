//! # Atesto (credential issuance service)
//!
//! `atesto` registers accounts, authenticates login attempts, issues
//! self-signed HS256 bearer tokens, and revokes accounts. Credentials are
//! hashed with Argon2id and kept in a sharded in-memory store for the
//! process lifetime; there is no persistence layer.
//!
//! The [`auth`] module is the core: the credential store, the hashing
//! service, the verification cache, the token engine, and the issuance
//! deduplicator. [`api`] is the thin axum surface over it, and [`cli`]
//! wires flags, environment, and logging into a running server.

pub mod api;
pub mod auth;
pub mod cli;
