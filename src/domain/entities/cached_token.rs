use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session material kept in the fast cache under a key derived from
/// `(app_id, token)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub app_id: String,
    pub user_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
