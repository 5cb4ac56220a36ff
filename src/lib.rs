//! Jigsaw Master entitlements
//!
//! Daily free-puzzle quota, premium subscription and category gating for the
//! Jigsaw Master client, persisted as one JSON record in a key-value store.
//!
//! ## Features
//!
//! - **Daily quota**: 5 free puzzles per calendar day, reset on first use of a new day
//! - **Premium**: monthly or yearly subscription lifting every limit until it expires
//! - **Category gating**: 3 of the 6 puzzle categories are open to free users
//! - **Fail-open storage**: unreadable or missing state falls back to defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jigsaw_entitlements::{EntitlementTracker, MemoryStore, PremiumDuration};
//!
//! # async fn demo() {
//! let tracker = EntitlementTracker::new(Arc::new(MemoryStore::new()));
//!
//! if tracker.can_play().await.allowed {
//!     tracker.record_play().await;
//! }
//! tracker.activate_premium(PremiumDuration::Month).await;
//! assert!(tracker.is_category_unlocked("vehicles").await);
//! # }
//! ```

pub mod capabilities;
pub mod catalog;
pub mod cli;
pub mod clock;
pub mod entitlements;
pub mod storage;
pub mod tracker;

// Re-exports for convenience
pub use capabilities::{Capabilities, Capability};
pub use catalog::{category_by_id, Category, CATEGORIES};
pub use clock::{Clock, FixedClock, SystemClock};
pub use entitlements::{
    EntitlementRecord, PlayDecision, PremiumDuration, PremiumFeatures, PremiumStatus,
    FREE_DAILY_PUZZLES, UNLIMITED,
};
pub use storage::{open_store, FileStore, KeyValueStore, MemoryStore, StorageBackend, StorageError};
pub use tracker::{
    CategoryAccess, EntitlementError, EntitlementSummary, EntitlementTracker, LIMITS_KEY,
};
