use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    app_error::{PortError, PortResult},
    domain::entities::user_profile::UserProfile,
    use_cases::token_validator::RemoteAuthority,
};

const USER_AGENT: &str = "tokengate/0.1";

/// [`RemoteAuthority`] backed by the user center's HTTP API.
///
/// 401, 403 and 404 answers are rejections (`Ok(None)`); transport failures
/// and any other non-success status are [`PortError::Remote`].
#[derive(Clone)]
pub struct HttpUserCenter {
    client: Client,
    base_url: Url,
}

#[derive(Serialize)]
struct TokenPayload<'a> {
    app_id: &'a str,
    token: &'a str,
    app_key: &'a str,
}

#[derive(Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct RegistrationResponse {
    registered_at: Option<DateTime<Utc>>,
}

impl HttpUserCenter {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self {
            client,
            base_url: with_trailing_slash(base_url),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> PortResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PortError::Remote("user center URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_token<T: for<'de> Deserialize<'de>>(
        &self,
        segments: &[&str],
        payload: &TokenPayload<'_>,
    ) -> PortResult<Option<T>> {
        let resp = self
            .client
            .post(self.endpoint(segments)?)
            .header("User-Agent", USER_AGENT)
            .json(payload)
            .send()
            .await
            .map_err(|e| PortError::Remote(e.to_string()))?;

        read_json(resp).await
    }
}

pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Maps a user center response: rejection statuses become `None`.
async fn read_json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> PortResult<Option<T>> {
    match resp.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
        status if status.is_success() => resp
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| PortError::Codec(e.to_string())),
        status => Err(PortError::Remote(format!("user center answered {status}"))),
    }
}

#[async_trait]
impl RemoteAuthority for HttpUserCenter {
    async fn validate_token(
        &self,
        app_id: &str,
        token: &str,
        app_key: &str,
    ) -> PortResult<Option<String>> {
        let payload = TokenPayload {
            app_id,
            token,
            app_key,
        };
        let parsed: Option<ValidateResponse> =
            self.post_token(&["token", "validate"], &payload).await?;

        Ok(parsed
            .and_then(|r| r.user_id)
            .filter(|user_id| !user_id.is_empty()))
    }

    async fn get_profile(
        &self,
        app_id: &str,
        token: &str,
        app_key: &str,
    ) -> PortResult<Option<UserProfile>> {
        let payload = TokenPayload {
            app_id,
            token,
            app_key,
        };
        self.post_token(&["token", "profile"], &payload).await
    }

    async fn registered_at(
        &self,
        app_id: &str,
        user_id: &str,
    ) -> PortResult<Option<DateTime<Utc>>> {
        let resp = self
            .client
            .get(self.endpoint(&["users", user_id, "registration"])?)
            .header("User-Agent", USER_AGENT)
            .query(&[("app_id", app_id)])
            .send()
            .await
            .map_err(|e| PortError::Remote(e.to_string()))?;

        let parsed: Option<RegistrationResponse> = read_json(resp).await?;
        Ok(parsed.and_then(|r| r.registered_at))
    }
}
