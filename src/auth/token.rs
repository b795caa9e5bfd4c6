//! Self-signed bearer tokens: HS256 over a fixed three-segment format.
//!
//! A token is `base64url(header) . base64url(claims) . base64url(signature)`
//! with no padding, the header fixed to `{"alg":"HS256","typ":"JWT"}`, and
//! the signature an HMAC-SHA256 over the first two segments under the
//! process-wide key. The format is bit-exact: algorithm string, separator,
//! and base64 variant must not drift, or previously issued tokens stop
//! verifying.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use super::error::AuthError;
use super::pool::Pool;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_HEADER: &[u8] = br#"{"alg":"HS256","typ":"JWT"}"#;
const EXPECTED_ALGORITHM: &str = "HS256";
const MAX_IDLE_POOLED: usize = 64;

/// Claims carried by a token payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

/// Issues and verifies tokens with one symmetric key, fixed at startup.
///
/// HMAC states and scratch buffers come from pools rather than per-call
/// allocation; `finalize_reset` leaves each returned state ready for reuse.
pub struct TokenSigner {
    header_b64: String,
    lifetime: Duration,
    macs: Pool<HmacSha256>,
    buffers: Pool<String>,
}

impl TokenSigner {
    /// Build a signer. Fails on an empty key; key length is otherwise free.
    pub fn new(key: &[u8], lifetime: Duration) -> Result<Self, AuthError> {
        if key.is_empty() {
            return Err(AuthError::Signing("signing key is empty".to_string()));
        }
        let prototype = HmacSha256::new_from_slice(key)
            .map_err(|err| AuthError::Signing(err.to_string()))?;
        Ok(Self {
            header_b64: URL_SAFE_NO_PAD.encode(TOKEN_HEADER),
            lifetime,
            macs: Pool::new(MAX_IDLE_POOLED, move || prototype.clone()),
            buffers: Pool::new(MAX_IDLE_POOLED, String::new),
        })
    }

    /// Issue a token for `identifier` expiring `lifetime` from now.
    pub fn issue(&self, identifier: &str) -> Result<String, AuthError> {
        let exp = unix_now().saturating_add(as_secs_i64(self.lifetime));
        self.issue_with_expiry(identifier, exp)
    }

    fn issue_with_expiry(&self, identifier: &str, exp: i64) -> Result<String, AuthError> {
        let claims = Claims {
            email: identifier.to_string(),
            exp,
        };
        let payload = serde_json::to_vec(&claims).map_err(|err| AuthError::Signing(err.to_string()))?;

        let mut token = self.buffers.acquire();
        token.clear();
        token.push_str(&self.header_b64);
        token.push('.');
        URL_SAFE_NO_PAD.encode_string(&payload, &mut token);

        let mut mac = self.macs.acquire();
        mac.update(token.as_bytes());
        let tag = mac.finalize_reset().into_bytes();

        token.push('.');
        URL_SAFE_NO_PAD.encode_string(tag, &mut token);

        Ok(token.clone())
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is recomputed and compared in constant time before any
    /// part of the payload is trusted. Structural, signature, and algorithm
    /// failures all collapse to [`AuthError::InvalidToken`]; an intact but
    /// stale token is [`AuthError::ExpiredToken`].
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::InvalidToken);
        };

        let signing_input = &token[..header.len() + 1 + payload.len()];
        let mut mac = self.macs.acquire();
        mac.update(signing_input.as_bytes());
        let tag = mac.finalize_reset().into_bytes();

        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        if !bool::from(tag.as_slice().ct_eq(&presented)) {
            return Err(AuthError::InvalidToken);
        }

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| AuthError::InvalidToken)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
        if header.alg != EXPECTED_ALGORITHM {
            return Err(AuthError::InvalidToken);
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims =
            serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::InvalidToken)?;

        if claims.exp <= unix_now() {
            return Err(AuthError::ExpiredToken);
        }

        Ok(claims)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

fn as_secs_i64(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}
