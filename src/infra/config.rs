use std::{net::SocketAddr, sync::Arc, time::Duration};

use env_helpers::{get_env, get_env_default};
use url::Url;

use super::InfraError;
use crate::{application::client_apps::ClientApps, use_cases::token_validator::CallTimeouts};

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    /// Base URL of the user center (token validation, profiles, registration).
    pub user_center_url: Url,
    /// Base URL of the service that knows each user's home region.
    pub region_oracle_url: Url,
    /// Region identifier of this deployment, compared against the oracle's answer.
    pub serving_region: String,
    pub client_apps: Arc<ClientApps>,
    pub timeouts: CallTimeouts,
    /// Upper bound for a whole HTTP request, on top of the per-call budgets.
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let database_url: String = get_env("DATABASE_URL");
        let database_max_connections: u32 = get_env_default("DATABASE_MAX_CONNECTIONS", 5);
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let user_center_url: Url = get_env("USER_CENTER_URL");
        let region_oracle_url: Url = get_env("REGION_ORACLE_URL");
        let serving_region: String = get_env("SERVING_REGION");
        if serving_region.trim().is_empty() {
            return Err(InfraError::Config("SERVING_REGION must not be empty".into()));
        }

        let client_apps_raw: String = get_env("CLIENT_APPS");
        let client_apps = ClientApps::from_json(&client_apps_raw).map_err(InfraError::Config)?;
        if client_apps.is_empty() {
            return Err(InfraError::Config(
                "CLIENT_APPS must configure at least one app".into(),
            ));
        }

        let defaults = CallTimeouts::default();
        let timeouts = CallTimeouts {
            cache: millis_env("CACHE_TIMEOUT_MS", defaults.cache),
            store: millis_env("STORE_TIMEOUT_MS", defaults.store),
            authority: millis_env("AUTHORITY_TIMEOUT_MS", defaults.authority),
            region: millis_env("REGION_TIMEOUT_MS", defaults.region),
        };
        let request_timeout = Duration::from_secs(get_env_default("REQUEST_TIMEOUT_SECS", 30));

        Ok(Self {
            bind_addr,
            database_url,
            database_max_connections,
            redis_url,
            user_center_url,
            region_oracle_url,
            serving_region: serving_region.trim().to_string(),
            client_apps: Arc::new(client_apps),
            timeouts,
            request_timeout,
        })
    }
}

fn millis_env(var: &'static str, default: Duration) -> Duration {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(get_env_default(var, default_ms))
}
