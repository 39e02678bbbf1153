//! In-memory implementations of the login collaborator ports.
//!
//! Every mock counts its calls and can be told to fail or to stall, so tests
//! can assert which tiers were consulted and how faults propagate.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    app_error::{PortError, PortResult},
    application::use_cases::token_validator::{
        CacheStore, RegionOracle, RemoteAuthority, TokenRepository,
    },
    domain::entities::{
        token_record::{InsertOutcome, TokenRecord},
        user_profile::{BrandInfo, UserProfile},
    },
    test_utils::test_datetime,
};

async fn stall(delay: &Mutex<Option<Duration>>) {
    let delay = *delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// InMemoryCacheStore
// ============================================================================

#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
    exists_calls: AtomicUsize,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    failing_deletes_left: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts raw bytes under `key` without counting a `set` call.
    pub fn insert_raw(&self, key: &str, value: Vec<u8>) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, Duration::ZERO));
    }

    pub fn stored(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
            + self.get_calls.load(Ordering::SeqCst)
            + self.set_calls()
            + self.delete_calls()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Fails only the next `n` deletes.
    pub fn fail_next_deletes(&self, n: usize) {
        self.failing_deletes_left.store(n, Ordering::SeqCst);
    }

    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    fn read_guard(&self) -> PortResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Cache("injected read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn exists(&self, key: &str) -> PortResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        self.read_guard()?;
        Ok(self.entries.lock().unwrap().contains_key(key))
    }

    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        self.read_guard()?;
        Ok(self.stored(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> PortResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Cache("injected write failure".into()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PortError::Cache("injected delete failure".into()));
        }
        let one_off = self
            .failing_deletes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if one_off {
            return Err(PortError::Cache("injected one-off delete failure".into()));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// InMemoryTokenRepository
// ============================================================================

#[derive(Default)]
pub struct InMemoryTokenRepository {
    records: Mutex<Vec<TokenRecord>>,
    inserts: Mutex<Vec<(BrandInfo, UserProfile)>>,
    find_by_app_token_calls: AtomicUsize,
    find_by_user_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: TokenRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn records_for(&self, user_id: &str) -> Vec<TokenRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Brand and profile of the most recent committed insert.
    pub fn last_insert(&self) -> Option<(BrandInfo, UserProfile)> {
        self.inserts.lock().unwrap().last().cloned()
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn find_by_user_calls(&self) -> usize {
        self.find_by_user_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.find_by_app_token_calls.load(Ordering::SeqCst)
            + self.find_by_user_calls()
            + self.insert_calls()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    fn read_guard(&self) -> PortResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Database("injected read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn find_by_app_token(
        &self,
        app_id: &str,
        token_hash: &str,
    ) -> PortResult<Option<TokenRecord>> {
        self.find_by_app_token_calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        self.read_guard()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.app_id == app_id && r.token_hash == token_hash)
            .cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> PortResult<Vec<TokenRecord>> {
        self.find_by_user_calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        self.read_guard()?;
        Ok(self.records_for(user_id))
    }

    async fn transactional_insert(
        &self,
        brand: &BrandInfo,
        profile: &UserProfile,
        record: &TokenRecord,
    ) -> PortResult<InsertOutcome> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        if self.fail_writes.load(Ordering::SeqCst) {
            // Nothing is committed on failure.
            return Err(PortError::Database("injected write failure".into()));
        }

        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|r| r.app_id == record.app_id && r.token_hash == record.token_hash)
        {
            return Ok(InsertOutcome::AlreadyExists);
        }
        records.push(record.clone());
        self.inserts
            .lock()
            .unwrap()
            .push((brand.clone(), profile.clone()));
        Ok(InsertOutcome::Inserted)
    }
}

// ============================================================================
// ScriptedUserCenter
// ============================================================================

/// User center that accepts exactly the tokens it was told about.
#[derive(Default)]
pub struct ScriptedUserCenter {
    accepted: Mutex<HashMap<String, (String, UserProfile)>>,
    validate_calls: AtomicUsize,
    profile_calls: AtomicUsize,
    registration_calls: AtomicUsize,
    fail_all: AtomicBool,
    fail_registration: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedUserCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&self, token: &str, user_id: &str, profile: UserProfile) {
        self.accepted
            .lock()
            .unwrap()
            .insert(token.to_string(), (user_id.to_string(), profile));
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.validate_calls()
            + self.profile_calls.load(Ordering::SeqCst)
            + self.registration_calls.load(Ordering::SeqCst)
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn fail_registration(&self, fail: bool) {
        self.fail_registration.store(fail, Ordering::SeqCst);
    }

    /// Stalls token validation and profile lookups.
    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    fn outage(&self) -> PortResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(PortError::Remote("injected user center outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteAuthority for ScriptedUserCenter {
    async fn validate_token(
        &self,
        _app_id: &str,
        token: &str,
        _app_key: &str,
    ) -> PortResult<Option<String>> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        // Lets concurrent logins interleave at the remote call like real I/O.
        tokio::task::yield_now().await;
        stall(&self.delay).await;
        self.outage()?;
        Ok(self
            .accepted
            .lock()
            .unwrap()
            .get(token)
            .map(|(user_id, _)| user_id.clone()))
    }

    async fn get_profile(
        &self,
        _app_id: &str,
        token: &str,
        _app_key: &str,
    ) -> PortResult<Option<UserProfile>> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        self.outage()?;
        Ok(self
            .accepted
            .lock()
            .unwrap()
            .get(token)
            .map(|(_, profile)| profile.clone()))
    }

    async fn registered_at(
        &self,
        _app_id: &str,
        _user_id: &str,
    ) -> PortResult<Option<DateTime<Utc>>> {
        self.registration_calls.fetch_add(1, Ordering::SeqCst);
        self.outage()?;
        if self.fail_registration.load(Ordering::SeqCst) {
            return Err(PortError::Remote("injected registration lookup failure".into()));
        }
        Ok(Some(test_datetime()))
    }
}

// ============================================================================
// InMemoryRegionOracle
// ============================================================================

/// Every user lives in the default region unless assigned elsewhere.
pub struct InMemoryRegionOracle {
    default_region: String,
    assignments: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryRegionOracle {
    pub fn new(default_region: &str) -> Self {
        Self {
            default_region: default_region.to_string(),
            assignments: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
        }
    }

    pub fn assign(&self, user_id: &str, region: &str) {
        self.assignments
            .lock()
            .unwrap()
            .insert(user_id.to_string(), region.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl RegionOracle for InMemoryRegionOracle {
    async fn region_of(&self, user_id: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        stall(&self.delay).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::Remote("injected region oracle failure".into()));
        }
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| self.default_region.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_profile, create_test_record};

    #[tokio::test]
    async fn token_repo_second_insert_is_a_no_op() {
        let repo = InMemoryTokenRepository::new();
        let record = create_test_record("shop", "tok", "u1");
        let profile = create_test_profile("u1", |_| {});
        let brand = BrandInfo {
            user_id: "u1".into(),
            app_id: "shop".into(),
            brand: "acme".into(),
            subscribed: false,
            registered_at: None,
        };

        let first = repo
            .transactional_insert(&brand, &profile, &record)
            .await
            .unwrap();
        let second = repo
            .transactional_insert(&brand, &profile, &record)
            .await
            .unwrap();

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::AlreadyExists);
        assert_eq!(repo.records_for("u1").len(), 1);
    }

    #[tokio::test]
    async fn cache_one_off_delete_failures() {
        let cache = InMemoryCacheStore::new();
        cache.insert_raw("k", b"v".to_vec());
        cache.fail_next_deletes(1);

        assert!(cache.delete("k").await.is_err());
        assert!(cache.delete("k").await.is_ok());
        assert!(cache.is_empty());
    }
}
