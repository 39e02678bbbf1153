//! Cache key derivation and the on-the-wire shape of [`CachedToken`].
//!
//! Keys are `login:token:{app_id}:{sha256(token)}`. The digest has a fixed
//! length, so an app id containing `:` still yields an unambiguous key, and
//! the raw bearer token never appears in the cache keyspace.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::{
    app_error::{PortError, PortResult},
    domain::entities::cached_token::CachedToken,
};

pub const TOKEN_KEY_PREFIX: &str = "login:token";

/// Hex SHA-256 of a bearer token. This is also what the durable store keeps.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn cache_key(app_id: &str, token: &str) -> String {
    cache_key_for_digest(app_id, &token_digest(token))
}

pub fn cache_key_for_digest(app_id: &str, token_hash: &str) -> String {
    format!("{TOKEN_KEY_PREFIX}:{app_id}:{token_hash}")
}

/// Builds the entry written after a successful resolution. The entry expires
/// together with its cache TTL, so a cached grant is trusted for at most one
/// token lifetime.
pub fn issue_cached_token(
    app_id: &str,
    user_id: &str,
    lifetime: Duration,
    now: DateTime<Utc>,
) -> CachedToken {
    let lifetime = chrono::Duration::from_std(lifetime).unwrap_or(chrono::Duration::MAX);
    CachedToken {
        app_id: app_id.to_string(),
        user_id: user_id.to_string(),
        expires_at: now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

pub fn encode_cached_token(token: &CachedToken) -> PortResult<Vec<u8>> {
    serde_json::to_vec(token).map_err(|e| PortError::Codec(e.to_string()))
}

pub fn decode_cached_token(raw: &[u8]) -> PortResult<CachedToken> {
    serde_json::from_slice(raw).map_err(|e| PortError::Codec(e.to_string()))
}

/// Cache TTL in whole seconds, never zero (a zero `SET EX` is rejected by Redis).
pub fn ttl_seconds(lifetime: Duration) -> u64 {
    lifetime.as_secs().max(1)
}
