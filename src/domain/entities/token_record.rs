use serde::Serialize;

/// Durable proof that a token was once issued to a user for an app.
///
/// Only the SHA-256 digest of the token is stored. Records carry no expiry;
/// liveness is always re-established against the user center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TokenRecord {
    pub app_id: String,
    pub user_id: String,
    pub token_hash: String,
}

/// Result of the cold-tier upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another request already stored the same `(app_id, token_hash)` pair.
    AlreadyExists,
}
