//! Entitlement tracker: daily quota, premium activation, category gating.
//!
//! Every operation is a full load-mutate-store cycle over the single
//! `user_limits` record. Operations on one tracker are serialized through an
//! async mutex so concurrent callers can't lose each other's updates.
//!
//! Storage failures never reach the caller. A record that can't be read or
//! parsed is treated as absent and replaced by a fresh default; failed
//! writes are logged and dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::capabilities::{Capabilities, Capability};
use crate::catalog::{self, Category, CATEGORIES};
use crate::clock::{Clock, SystemClock};
use crate::entitlements::{
    EntitlementRecord, PlayDecision, PremiumDuration, PremiumFeatures, PremiumStatus,
    FREE_DAILY_PUZZLES,
};
use crate::storage::{KeyValueStore, StorageError};

/// Storage key used by the mobile client.
pub const LIMITS_KEY: &str = "user_limits";

#[derive(Debug, thiserror::Error)]
pub enum EntitlementError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Corrupt entitlement record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Everything a status screen shows, from one record load.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSummary {
    pub record: EntitlementRecord,
    pub premium: PremiumStatus,
    pub remaining_puzzles: i64,
    pub daily_limit: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryAccess {
    #[serde(flatten)]
    pub category: Category,
    pub unlocked: bool,
}

pub struct EntitlementTracker {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key: String,
    write_lock: Mutex<()>,
}

impl EntitlementTracker {
    /// Tracker over `store` using the wall clock and the default key
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            key: LIMITS_KEY.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    /// Use a different storage key (e.g. one record per profile)
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Current record, rolled over to today and created if missing.
    pub async fn limits(&self) -> EntitlementRecord {
        let _guard = self.write_lock.lock().await;
        self.load_or_init().await
    }

    pub async fn can_play(&self) -> PlayDecision {
        let _guard = self.write_lock.lock().await;
        let record = self.load_or_init().await;
        let decision = record.play_decision(self.clock.now());
        if !decision.allowed {
            debug!(
                used = record.daily_puzzles_used,
                limit = FREE_DAILY_PUZZLES,
                "Daily puzzle limit reached"
            );
        }
        decision
    }

    /// Count one played puzzle against today's free quota.
    ///
    /// Premium users never accumulate usage.
    pub async fn record_play(&self) {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_or_init().await;
        if record.is_premium_active(self.clock.now()) {
            return;
        }
        record.daily_puzzles_used = record.daily_puzzles_used.saturating_add(1);
        debug!(used = record.daily_puzzles_used, "Recorded puzzle play");
        self.save(&record).await;
    }

    pub async fn is_category_unlocked(&self, category_id: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let record = self.load_or_init().await;
        record
            .capabilities(self.clock.now())
            .has(Capability::AllCategories)
            || catalog::is_free_category(category_id)
    }

    /// Every category with its unlocked state for the current user.
    pub async fn categories(&self) -> Vec<CategoryAccess> {
        let _guard = self.write_lock.lock().await;
        let record = self.load_or_init().await;
        let all = record
            .capabilities(self.clock.now())
            .has(Capability::AllCategories);
        CATEGORIES
            .iter()
            .map(|category| CategoryAccess {
                category: *category,
                unlocked: all || category.free,
            })
            .collect()
    }

    /// Free puzzles left today, or [`crate::UNLIMITED`] for premium.
    pub async fn remaining_puzzles(&self) -> i64 {
        let _guard = self.write_lock.lock().await;
        let record = self.load_or_init().await;
        record.remaining_puzzles(self.clock.now())
    }

    /// Start (or restart) a subscription from now. Returns the new expiry.
    pub async fn activate_premium(&self, duration: PremiumDuration) -> DateTime<Utc> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_or_init().await;
        let expiry = duration.expiry_from(self.clock.now());
        record.is_premium = true;
        record.premium_expiry = Some(expiry);
        info!(%duration, expires_at = %expiry.to_rfc3339(), "Premium activated");
        self.save(&record).await;
        expiry
    }

    pub async fn premium_features(&self) -> PremiumFeatures {
        PremiumFeatures::from(&self.capabilities().await)
    }

    pub async fn capabilities(&self) -> Capabilities {
        let _guard = self.write_lock.lock().await;
        let record = self.load_or_init().await;
        record.capabilities(self.clock.now())
    }

    /// Clear today's usage without waiting for the day to change.
    pub async fn reset_daily_limits(&self) {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_or_init().await;
        record.daily_puzzles_used = 0;
        record.last_reset_date = crate::entitlements::day_key(self.clock.today());
        info!("Daily limits reset");
        self.save(&record).await;
    }

    pub async fn status(&self) -> EntitlementSummary {
        let _guard = self.write_lock.lock().await;
        let record = self.load_or_init().await;
        let now = self.clock.now();
        EntitlementSummary {
            premium: record.premium_status(now),
            remaining_puzzles: record.remaining_puzzles(now),
            daily_limit: FREE_DAILY_PUZZLES,
            record,
        }
    }

    // Callers hold `write_lock`.
    async fn load_or_init(&self) -> EntitlementRecord {
        let today = self.clock.today();
        match self.read_record().await {
            Ok(Some(mut record)) => {
                if record.roll_over(today) {
                    info!(date = %record.last_reset_date, "New day, daily puzzle count reset");
                    self.save(&record).await;
                }
                return record;
            }
            Ok(None) => debug!(key = %self.key, "No stored limits, creating defaults"),
            Err(e) => warn!(key = %self.key, "Error getting user limits: {}", e),
        }

        let record = EntitlementRecord::new(today);
        self.save(&record).await;
        record
    }

    async fn read_record(&self) -> Result<Option<EntitlementRecord>, EntitlementError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn write_record(&self, record: &EntitlementRecord) -> Result<(), EntitlementError> {
        let json = serde_json::to_string(record)?;
        self.store.set(&self.key, &json).await?;
        Ok(())
    }

    async fn save(&self, record: &EntitlementRecord) {
        if let Err(e) = self.write_record(record).await {
            error!(key = %self.key, "Error saving user limits: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::entitlements::UNLIMITED;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    fn fixture() -> (Arc<MemoryStore>, Arc<FixedClock>, EntitlementTracker) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(start()));
        let tracker = EntitlementTracker::with_clock(store.clone(), clock.clone());
        (store, clock, tracker)
    }

    async fn stored(store: &MemoryStore) -> EntitlementRecord {
        let raw = store.get(LIMITS_KEY).await.unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    /// Store whose reads and writes can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("read failed".into()));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("write failed".into()));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_first_access_creates_and_persists_default() {
        let (store, _clock, tracker) = fixture();

        let limits = tracker.limits().await;
        assert_eq!(limits, EntitlementRecord::new(start().date_naive()));
        assert_eq!(stored(&store).await, limits);
    }

    #[tokio::test]
    async fn test_stale_day_resets_counter() {
        let stale = r#"{"dailyPuzzlesUsed":4,"lastResetDate":"2026-03-13","isPremium":false}"#;
        let store = Arc::new(MemoryStore::with_entry(LIMITS_KEY, stale));
        let clock = Arc::new(FixedClock::new(start()));
        let tracker = EntitlementTracker::with_clock(store.clone(), clock);

        let limits = tracker.limits().await;
        assert_eq!(limits.daily_puzzles_used, 0);
        assert_eq!(limits.last_reset_date, "2026-03-14");
        assert_eq!(stored(&store).await, limits);
    }

    #[tokio::test]
    async fn test_legacy_date_string_is_treated_as_other_day() {
        let legacy = r#"{"dailyPuzzlesUsed":5,"lastResetDate":"Sat Mar 14 2026","isPremium":false}"#;
        let store = Arc::new(MemoryStore::with_entry(LIMITS_KEY, legacy));
        let tracker =
            EntitlementTracker::with_clock(store, Arc::new(FixedClock::new(start())));

        assert!(tracker.can_play().await.allowed);
        assert_eq!(tracker.remaining_puzzles().await, 5);
    }

    #[tokio::test]
    async fn test_five_plays_exhaust_free_quota() {
        let (_store, _clock, tracker) = fixture();

        for _ in 0..FREE_DAILY_PUZZLES {
            assert!(tracker.can_play().await.allowed);
            tracker.record_play().await;
        }

        let decision = tracker.can_play().await;
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("5 puzzles"));
        assert_eq!(tracker.remaining_puzzles().await, 0);
    }

    #[tokio::test]
    async fn test_remaining_after_two_plays() {
        let (_store, _clock, tracker) = fixture();
        tracker.record_play().await;
        tracker.record_play().await;
        assert_eq!(tracker.remaining_puzzles().await, 3);
    }

    #[tokio::test]
    async fn test_quota_comes_back_next_day() {
        let (_store, clock, tracker) = fixture();
        for _ in 0..FREE_DAILY_PUZZLES {
            tracker.record_play().await;
        }
        assert!(!tracker.can_play().await.allowed);

        clock.advance(Duration::days(1));
        assert!(tracker.can_play().await.allowed);
        assert_eq!(tracker.remaining_puzzles().await, 5);
    }

    #[tokio::test]
    async fn test_active_premium_ignores_usage() {
        let blob = r#"{"dailyPuzzlesUsed":50,"lastResetDate":"2026-03-14","isPremium":true,"premiumExpiry":"2026-04-01T00:00:00Z"}"#;
        let store = Arc::new(MemoryStore::with_entry(LIMITS_KEY, blob));
        let tracker =
            EntitlementTracker::with_clock(store.clone(), Arc::new(FixedClock::new(start())));

        assert!(tracker.can_play().await.allowed);
        assert_eq!(tracker.remaining_puzzles().await, UNLIMITED);

        tracker.record_play().await;
        assert_eq!(stored(&store).await.daily_puzzles_used, 50);
    }

    #[tokio::test]
    async fn test_activate_month_sets_exact_expiry_and_unlocks_all() {
        let (store, _clock, tracker) = fixture();
        assert!(!tracker.is_category_unlocked("objects").await);

        let expiry = tracker.activate_premium(PremiumDuration::Month).await;
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 4, 14, 9, 30, 0).unwrap());

        let record = stored(&store).await;
        assert!(record.is_premium);
        assert_eq!(record.premium_expiry, Some(expiry));

        for category in CATEGORIES {
            assert!(tracker.is_category_unlocked(category.id).await);
        }
        assert!(tracker.is_category_unlocked("anything-else").await);
    }

    #[tokio::test]
    async fn test_activate_year() {
        let (_store, _clock, tracker) = fixture();
        let expiry = tracker.activate_premium(PremiumDuration::Year).await;
        assert_eq!(expiry, Utc.with_ymd_and_hms(2027, 3, 14, 9, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn test_expired_premium_falls_back_to_free_tier() {
        let (_store, clock, tracker) = fixture();
        tracker.activate_premium(PremiumDuration::Month).await;
        assert!(tracker.premium_features().await.no_ads);

        clock.advance(Duration::days(40));
        assert!(!tracker.is_category_unlocked("vehicles").await);
        assert_eq!(tracker.remaining_puzzles().await, 5);
        assert_eq!(
            tracker.premium_features().await,
            PremiumFeatures::from(&Capabilities::free())
        );

        let status = tracker.status().await;
        assert!(matches!(status.premium, PremiumStatus::Expired { .. }));
        assert!(status.record.is_premium);
    }

    #[tokio::test]
    async fn test_free_categories() {
        let (_store, _clock, tracker) = fixture();
        assert!(tracker.is_category_unlocked("animals").await);
        assert!(tracker.is_category_unlocked("nature").await);
        assert!(tracker.is_category_unlocked("food").await);
        assert!(!tracker.is_category_unlocked("objects").await);
        assert!(!tracker.is_category_unlocked("buildings").await);

        let unlocked: Vec<_> = tracker
            .categories()
            .await
            .into_iter()
            .filter(|access| access.unlocked)
            .map(|access| access.category.id)
            .collect();
        assert_eq!(unlocked, vec!["animals", "nature", "food"]);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_replaced_with_default() {
        let store = Arc::new(MemoryStore::with_entry(LIMITS_KEY, "{not json"));
        let tracker =
            EntitlementTracker::with_clock(store.clone(), Arc::new(FixedClock::new(start())));

        let limits = tracker.limits().await;
        assert_eq!(limits, EntitlementRecord::new(start().date_naive()));
        assert_eq!(stored(&store).await, limits);
    }

    #[tokio::test]
    async fn test_negative_usage_is_corrupt() {
        let blob = r#"{"dailyPuzzlesUsed":-3,"lastResetDate":"2026-03-14","isPremium":false}"#;
        let store = Arc::new(MemoryStore::with_entry(LIMITS_KEY, blob));
        let tracker = EntitlementTracker::with_clock(store, Arc::new(FixedClock::new(start())));
        assert_eq!(tracker.limits().await.daily_puzzles_used, 0);
    }

    #[tokio::test]
    async fn test_read_failure_fails_open() {
        let store = Arc::new(FlakyStore::default());
        store.fail_reads.store(true, Ordering::SeqCst);
        let tracker =
            EntitlementTracker::with_clock(store.clone(), Arc::new(FixedClock::new(start())));

        assert!(tracker.can_play().await.allowed);
        assert_eq!(tracker.remaining_puzzles().await, 5);
        assert!(!tracker.is_category_unlocked("objects").await);
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let store = Arc::new(FlakyStore::default());
        store.fail_writes.store(true, Ordering::SeqCst);
        let tracker =
            EntitlementTracker::with_clock(store.clone(), Arc::new(FixedClock::new(start())));

        tracker.record_play().await;
        tracker.activate_premium(PremiumDuration::Month).await;
        // Nothing was persisted, so every read starts from defaults again.
        assert_eq!(tracker.remaining_puzzles().await, 5);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_reset_daily_limits() {
        let (store, _clock, tracker) = fixture();
        for _ in 0..4 {
            tracker.record_play().await;
        }
        tracker.reset_daily_limits().await;
        assert_eq!(stored(&store).await.daily_puzzles_used, 0);
        assert_eq!(tracker.remaining_puzzles().await, 5);
    }

    #[tokio::test]
    async fn test_status_summary() {
        let (_store, _clock, tracker) = fixture();
        tracker.record_play().await;

        let status = tracker.status().await;
        assert_eq!(status.record.daily_puzzles_used, 1);
        assert_eq!(status.remaining_puzzles, 4);
        assert_eq!(status.daily_limit, 5);
        assert_eq!(status.premium, PremiumStatus::Inactive);
    }

    #[tokio::test]
    async fn test_custom_key() {
        let store = Arc::new(MemoryStore::new());
        let tracker =
            EntitlementTracker::with_clock(store.clone(), Arc::new(FixedClock::new(start())))
                .with_key("profile_2_limits");

        tracker.record_play().await;
        assert!(store.get(LIMITS_KEY).await.unwrap().is_none());
        assert!(store.get("profile_2_limits").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_plays_are_not_lost() {
        let (store, _clock, tracker) = fixture();
        let tracker = Arc::new(tracker);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.record_play().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(stored(&store).await.daily_puzzles_used, 4);
    }
}
