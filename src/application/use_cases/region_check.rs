//! Region consistency check and the best-effort cache sweep that runs when a
//! user's data has moved to another region.

use tracing::{instrument, warn};

use super::token_validator::{TokenValidator, timed};
use crate::{
    app_error::{AuthError, AuthResult},
    application::cache_keys::cache_key_for_digest,
};

/// Each stale cache key gets one retry after a failed delete.
const DELETE_ATTEMPTS: u32 = 2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub attempted: usize,
    pub purged: usize,
    pub failed: usize,
    /// The user's token records could not be listed, so nothing was attempted.
    pub skipped: bool,
}

impl TokenValidator {
    /// Succeeds only when the user's authoritative region is the one serving
    /// this request. On a mismatch every cached session of the user is purged
    /// on a best-effort basis and `UserCreditNotInCurrentRegion` is returned
    /// no matter how the purge went.
    #[instrument(skip(self))]
    pub async fn check_user_credit_region(&self, user_id: &str) -> AuthResult<()> {
        let authoritative = timed(self.timeouts.region, self.regions.region_of(user_id))
            .await
            .map_err(AuthError::RegionLookupFailed)?;

        if authoritative.trim().eq_ignore_ascii_case(&self.serving_region) {
            return Ok(());
        }

        let report = self.purge_user_sessions(user_id).await;
        warn!(
            serving = %self.serving_region,
            authoritative = %authoritative,
            attempted = report.attempted,
            purged = report.purged,
            failed = report.failed,
            skipped = report.skipped,
            "user credit lives in another region"
        );

        Err(AuthError::UserCreditNotInCurrentRegion {
            serving: self.serving_region.clone(),
            authoritative,
        })
    }

    pub(crate) async fn purge_user_sessions(&self, user_id: &str) -> PurgeReport {
        let records = match timed(self.timeouts.store, self.tokens.find_by_user(user_id)).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "could not list token records for cache purge");
                return PurgeReport {
                    skipped: true,
                    ..PurgeReport::default()
                };
            }
        };

        let mut report = PurgeReport::default();
        for record in &records {
            report.attempted += 1;
            let key = cache_key_for_digest(&record.app_id, &record.token_hash);
            if self.delete_with_retry(&key).await {
                report.purged += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    async fn delete_with_retry(&self, key: &str) -> bool {
        for attempt in 1..=DELETE_ATTEMPTS {
            match timed(self.timeouts.cache, self.cache.delete(key)).await {
                Ok(()) => return true,
                Err(err) => warn!(attempt, error = %err, "cache delete failed"),
            }
        }
        false
    }
}
