use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{
    adapters::user_center::with_trailing_slash,
    app_error::{PortError, PortResult},
    use_cases::token_validator::RegionOracle,
};

/// Asks the region service which region holds a user's credit data.
#[derive(Clone)]
pub struct HttpRegionOracle {
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct RegionResponse {
    region: String,
}

impl HttpRegionOracle {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self {
            client,
            base_url: with_trailing_slash(base_url),
        }
    }

    fn region_url(&self, user_id: &str) -> PortResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PortError::Remote("region oracle URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["users", user_id, "region"]);
        Ok(url)
    }
}

#[async_trait]
impl RegionOracle for HttpRegionOracle {
    async fn region_of(&self, user_id: &str) -> PortResult<String> {
        let resp = self
            .client
            .get(self.region_url(user_id)?)
            .send()
            .await
            .map_err(|e| PortError::Remote(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PortError::Remote(format!("region oracle answered {status}")));
        }

        let body: RegionResponse = resp
            .json()
            .await
            .map_err(|e| PortError::Codec(e.to_string()))?;
        if body.region.trim().is_empty() {
            return Err(PortError::Remote(format!("no region known for user {user_id}")));
        }
        Ok(body.region)
    }
}
