use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub region: String,
}

/// Per-app brand and subscription flags written together with the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandInfo {
    pub user_id: String,
    pub app_id: String,
    pub brand: String,
    pub subscribed: bool,
    pub registered_at: Option<DateTime<Utc>>,
}
