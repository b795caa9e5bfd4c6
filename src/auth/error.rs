//! Error taxonomy for the credential core.

use thiserror::Error;

/// Failures surfaced by [`AuthService`](super::AuthService) operations.
///
/// Store-miss and wrong-secret are deliberately collapsed into the single
/// [`InvalidCredentials`](Self::InvalidCredentials) variant so nothing below
/// the HTTP layer can leak whether an identifier exists.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Missing, empty, or malformed identifier/secret. Nothing was mutated.
    #[error("invalid identifier or secret")]
    BadInput,

    /// Registration for an identifier that already has a record.
    #[error("account already exists")]
    AlreadyExists,

    /// Unknown identifier or wrong secret.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Structural, signature, or algorithm failure while verifying a token.
    #[error("invalid token")]
    InvalidToken,

    /// The token verified but its expiry has elapsed.
    #[error("token expired")]
    ExpiredToken,

    /// The hashing function itself failed. Not retried; the inputs would
    /// reproduce the failure.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// A stored hash failed to parse. Store corruption, never a mismatch.
    #[error("stored credential is corrupt: {0}")]
    CorruptHash(String),

    /// Token construction failed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// Whether this error is an internal fault rather than a client error.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Hashing(_) | Self::CorruptHash(_) | Self::Signing(_)
        )
    }
}
