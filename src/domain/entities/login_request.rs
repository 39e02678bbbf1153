use std::fmt;

use serde::Deserialize;

/// A login attempt as received from the transport layer. Absent fields
/// deserialize as blank so they are reported like empty ones.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub app_id: String,
    pub token: String,
    pub app_key: String,
}

impl LoginRequest {
    pub fn new(
        app_id: impl Into<String>,
        token: impl Into<String>,
        app_key: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            token: token.into(),
            app_key: app_key.into(),
        }
    }

    /// Name of the first blank field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.app_id.trim().is_empty() {
            Some("app_id")
        } else if self.token.trim().is_empty() {
            Some("token")
        } else if self.app_key.trim().is_empty() {
            Some("app_key")
        } else {
            None
        }
    }
}

// Token and app key never reach the logs.
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("app_id", &self.app_id)
            .field("token", &"[redacted]")
            .field("app_key", &"[redacted]")
            .finish()
    }
}
