use std::{collections::HashMap, time::Duration};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::app_error::{AuthError, AuthResult};

/// A client application allowed to log users in.
#[derive(Debug)]
pub struct ClientApp {
    pub app_key: SecretString,
    /// How long a successful login stays cached.
    pub token_lifetime: Duration,
    pub brand: String,
}

impl ClientApp {
    pub fn new(app_key: &str, token_lifetime: Duration, brand: impl Into<String>) -> Self {
        Self {
            app_key: SecretString::new(app_key.into()),
            token_lifetime,
            brand: brand.into(),
        }
    }

    pub fn key_matches(&self, presented: &str) -> bool {
        self.app_key.expose_secret() == presented
    }
}

#[derive(Deserialize)]
struct RawClientApp {
    app_key: String,
    token_lifetime_secs: u64,
    brand: String,
}

/// Configured client applications keyed by app id.
#[derive(Debug, Default)]
pub struct ClientApps {
    apps: HashMap<String, ClientApp>,
}

impl ClientApps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(mut self, app_id: impl Into<String>, app: ClientApp) -> Self {
        self.apps.insert(app_id.into(), app);
        self
    }

    /// Parses the `CLIENT_APPS` JSON document:
    /// `{"<app_id>": {"app_key": "...", "token_lifetime_secs": 86400, "brand": "..."}}`.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let parsed: HashMap<String, RawClientApp> =
            serde_json::from_str(raw).map_err(|e| format!("CLIENT_APPS is not valid JSON: {e}"))?;

        let mut apps = HashMap::with_capacity(parsed.len());
        for (app_id, raw_app) in parsed {
            if app_id.trim().is_empty() {
                return Err("CLIENT_APPS contains an empty app id".into());
            }
            if raw_app.app_key.is_empty() {
                return Err(format!("app {app_id} has an empty app_key"));
            }
            if raw_app.token_lifetime_secs == 0 {
                return Err(format!("app {app_id} must have a non-zero token_lifetime_secs"));
            }
            apps.insert(
                app_id,
                ClientApp::new(
                    &raw_app.app_key,
                    Duration::from_secs(raw_app.token_lifetime_secs),
                    raw_app.brand,
                ),
            );
        }
        Ok(Self { apps })
    }

    pub fn get(&self, app_id: &str) -> Option<&ClientApp> {
        self.apps.get(app_id)
    }

    /// Looks up the app and checks the presented key.
    pub fn authorize(&self, app_id: &str, app_key: &str) -> AuthResult<&ClientApp> {
        let app = self
            .get(app_id)
            .ok_or_else(|| AuthError::UserCenterConfNotFound(app_id.to_string()))?;
        if !app.key_matches(app_key) {
            return Err(AuthError::InputParamInvalid(
                "app_key does not match the configured client application".into(),
            ));
        }
        Ok(app)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}
