use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::{
    app_error::{AuthError, AuthResult, PortError, PortResult},
    application::{
        cache_keys::{
            cache_key_for_digest, decode_cached_token, encode_cached_token, issue_cached_token,
            token_digest, ttl_seconds,
        },
        client_apps::{ClientApp, ClientApps},
    },
    domain::entities::{
        cached_token::CachedToken,
        login_request::LoginRequest,
        token_record::{InsertOutcome, TokenRecord},
        user_profile::{BrandInfo, UserProfile},
    },
};

// ============================================================================
// Collaborator Ports
// ============================================================================

/// Key-value store with TTL. Values are opaque to the store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &str) -> PortResult<bool>;
    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> PortResult<()>;
    async fn delete(&self, key: &str) -> PortResult<()>;
}

/// Durable store of issued-token records.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn find_by_app_token(&self, app_id: &str, token_hash: &str)
    -> PortResult<Option<TokenRecord>>;
    async fn find_by_user(&self, user_id: &str) -> PortResult<Vec<TokenRecord>>;
    /// Writes brand info, profile and token record in one transaction.
    /// A second insert of the same `(app_id, token_hash)` is a no-op.
    async fn transactional_insert(
        &self,
        brand: &BrandInfo,
        profile: &UserProfile,
        record: &TokenRecord,
    ) -> PortResult<InsertOutcome>;
}

/// The user center: system of record for token validity and profiles.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// `Ok(None)` means the authority rejected the token.
    async fn validate_token(&self, app_id: &str, token: &str, app_key: &str)
    -> PortResult<Option<String>>;
    async fn get_profile(&self, app_id: &str, token: &str, app_key: &str)
    -> PortResult<Option<UserProfile>>;
    async fn registered_at(&self, app_id: &str, user_id: &str)
    -> PortResult<Option<DateTime<Utc>>>;
}

#[async_trait]
pub trait RegionOracle: Send + Sync {
    async fn region_of(&self, user_id: &str) -> PortResult<String>;
}

// ============================================================================
// Call Budgets & Counters
// ============================================================================

/// Timeout budget per collaborator. A call that exceeds its budget fails with
/// [`PortError::Timeout`] and is reported as that call site's I/O error.
#[derive(Debug, Clone, Copy)]
pub struct CallTimeouts {
    pub cache: Duration,
    pub store: Duration,
    pub authority: Duration,
    pub region: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            cache: Duration::from_millis(200),
            store: Duration::from_secs(2),
            authority: Duration::from_secs(5),
            region: Duration::from_secs(2),
        }
    }
}

/// Advisory cache hit/miss counters, scoped to one validator (and its clones).
/// Never consulted by an authentication decision.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStatsSnapshot {
    pub fn hit_ratio(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        (total > 0).then(|| self.hits as f64 / total as f64)
    }
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

pub(crate) async fn timed<T, F>(budget: Duration, call: F) -> PortResult<T>
where
    F: Future<Output = PortResult<T>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(PortError::Timeout(budget)),
    }
}

// ============================================================================
// TokenValidator
// ============================================================================

#[derive(Clone)]
pub struct TokenValidator {
    pub(super) cache: Arc<dyn CacheStore>,
    pub(super) tokens: Arc<dyn TokenRepository>,
    authority: Arc<dyn RemoteAuthority>,
    pub(super) regions: Arc<dyn RegionOracle>,
    apps: Arc<ClientApps>,
    pub(super) serving_region: String,
    pub(super) timeouts: CallTimeouts,
    stats: Arc<CacheStats>,
}

impl TokenValidator {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        tokens: Arc<dyn TokenRepository>,
        authority: Arc<dyn RemoteAuthority>,
        regions: Arc<dyn RegionOracle>,
        apps: Arc<ClientApps>,
        serving_region: String,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            cache,
            tokens,
            authority,
            regions,
            apps,
            serving_region,
            timeouts,
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn serving_region(&self) -> &str {
        &self.serving_region
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Decides whether `request.token` currently authorizes a login.
    ///
    /// Tiers are consulted in order: cache, durable store, user center. Every
    /// successful resolution ends with the region check. A cached grant is
    /// trusted until its TTL lapses, even if the user center revokes the
    /// token in the meantime.
    #[instrument(skip(self, request), fields(app_id = %request.app_id))]
    pub async fn authenticate(&self, request: &LoginRequest) -> AuthResult<()> {
        if let Some(field) = request.missing_field() {
            return Err(AuthError::InputParamInvalid(format!("{field} must not be empty")));
        }
        let app = self.apps.authorize(&request.app_id, &request.app_key)?;

        let token_hash = token_digest(&request.token);
        let key = cache_key_for_digest(&request.app_id, &token_hash);

        if let Some(cached) = self.read_cached(&key).await? {
            self.stats.record_hit();
            if cached.is_expired_at(Utc::now()) {
                debug!(user_id = %cached.user_id, "cached token is past expiry");
                return Err(AuthError::OldToken);
            }
            self.check_user_credit_region(&cached.user_id).await?;
            return Ok(());
        }
        self.stats.record_miss();

        let record = timed(
            self.timeouts.store,
            self.tokens.find_by_app_token(&request.app_id, &token_hash),
        )
        .await
        .map_err(AuthError::ReadDbFailed)?;

        match record {
            Some(record) => self.revalidate_known_token(request, app, &key, record).await,
            None => self.admit_new_token(request, app, &key, token_hash).await,
        }
    }

    async fn read_cached(&self, key: &str) -> AuthResult<Option<CachedToken>> {
        let present = timed(self.timeouts.cache, self.cache.exists(key))
            .await
            .map_err(AuthError::ReadRedisFailed)?;
        if !present {
            return Ok(None);
        }

        // The entry may expire between EXISTS and GET; that is a plain miss.
        let Some(raw) = timed(self.timeouts.cache, self.cache.get(key))
            .await
            .map_err(AuthError::ReadRedisFailed)?
        else {
            return Ok(None);
        };

        match decode_cached_token(&raw) {
            Ok(cached) => Ok(Some(cached)),
            Err(err) => {
                warn!(error = %err, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Durable tier: the token was issued before, but only the user center
    /// can say whether it is still live.
    async fn revalidate_known_token(
        &self,
        request: &LoginRequest,
        app: &ClientApp,
        key: &str,
        record: TokenRecord,
    ) -> AuthResult<()> {
        let user_id = match timed(
            self.timeouts.authority,
            self.authority
                .validate_token(&request.app_id, &request.token, &request.app_key),
        )
        .await
        {
            Ok(Some(user_id)) if !user_id.is_empty() => user_id,
            Ok(_) => return Err(AuthError::OldToken),
            Err(err) => {
                warn!(error = %err, "user center unavailable while revalidating stored token");
                return Err(AuthError::OldToken);
            }
        };

        // The cache grant must stay reachable through the stored record.
        if user_id != record.user_id {
            warn!(
                stored_user_id = %record.user_id,
                user_id = %user_id,
                "user center resolved a stored token to a different user"
            );
            return Err(AuthError::OldToken);
        }

        self.check_user_credit_region(&user_id).await?;
        self.write_cached(key, &request.app_id, &user_id, app.token_lifetime)
            .await
    }

    /// Cold tier: first login with this token.
    async fn admit_new_token(
        &self,
        request: &LoginRequest,
        app: &ClientApp,
        key: &str,
        token_hash: String,
    ) -> AuthResult<()> {
        let user_id = match timed(
            self.timeouts.authority,
            self.authority
                .validate_token(&request.app_id, &request.token, &request.app_key),
        )
        .await
        {
            Ok(Some(user_id)) if !user_id.is_empty() => user_id,
            Ok(_) => return Err(AuthError::AuthTokenFromUserCenterFailed),
            Err(err) => {
                warn!(error = %err, "user center validation failed for new token");
                return Err(AuthError::AuthTokenFromUserCenterFailed);
            }
        };

        let mut profile = match timed(
            self.timeouts.authority,
            self.authority
                .get_profile(&request.app_id, &request.token, &request.app_key),
        )
        .await
        {
            Ok(Some(profile)) => profile,
            Ok(None) => return Err(AuthError::AuthTokenFromUserCenterFailed),
            Err(err) => {
                warn!(error = %err, "user center profile lookup failed");
                return Err(AuthError::AuthTokenFromUserCenterFailed);
            }
        };
        profile.user_id = user_id.clone();

        let registered_at = timed(
            self.timeouts.authority,
            self.authority.registered_at(&request.app_id, &user_id),
        )
        .await
        .unwrap_or_else(|err| {
            warn!(error = %err, "registration time lookup failed, storing without it");
            None
        });

        self.check_user_credit_region(&user_id).await?;

        let brand = BrandInfo {
            user_id: user_id.clone(),
            app_id: request.app_id.clone(),
            brand: app.brand.clone(),
            subscribed: false,
            registered_at,
        };
        let record = TokenRecord {
            app_id: request.app_id.clone(),
            user_id: user_id.clone(),
            token_hash,
        };

        let outcome = timed(
            self.timeouts.store,
            self.tokens.transactional_insert(&brand, &profile, &record),
        )
        .await
        .map_err(AuthError::WriteDbFailed)?;

        if outcome == InsertOutcome::AlreadyExists {
            debug!(user_id = %user_id, "token record already stored by a concurrent login");
        } else {
            info!(user_id = %user_id, "stored first login for token");
        }

        self.write_cached(key, &request.app_id, &user_id, app.token_lifetime)
            .await
    }

    async fn write_cached(
        &self,
        key: &str,
        app_id: &str,
        user_id: &str,
        lifetime: Duration,
    ) -> AuthResult<()> {
        let cached = issue_cached_token(app_id, user_id, lifetime, Utc::now());
        let bytes = encode_cached_token(&cached).map_err(AuthError::WriteRedisFailed)?;
        timed(
            self.timeouts.cache,
            self.cache
                .set(key, bytes, Duration::from_secs(ttl_seconds(lifetime))),
        )
        .await
        .map_err(AuthError::WriteRedisFailed)
    }
}
