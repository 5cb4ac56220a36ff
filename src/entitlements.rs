//! Entitlement record and premium status evaluation types.

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::capabilities::{Capabilities, Capability};

/// Puzzles a free-tier user may start per calendar day.
pub const FREE_DAILY_PUZZLES: u32 = 5;

/// Returned by remaining-puzzle queries when premium is active.
pub const UNLIMITED: i64 = -1;

/// Format of `last_reset_date`.
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Render a calendar day the way it is stored in `last_reset_date`.
pub fn day_key(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// The single persisted record tracking quota usage and subscription state.
///
/// Field names on the wire match the mobile client's `user_limits` blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    /// Puzzles played on `last_reset_date`.
    pub daily_puzzles_used: u32,
    /// Last day on which `daily_puzzles_used` was valid.
    pub last_reset_date: String,
    /// Set once a subscription has been activated, even after it lapses.
    pub is_premium: bool,
    /// Absent when no subscription was ever purchased.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_expiry: Option<DateTime<Utc>>,
}

impl EntitlementRecord {
    /// Fresh record: nothing played, never subscribed.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            daily_puzzles_used: 0,
            last_reset_date: day_key(today),
            is_premium: false,
            premium_expiry: None,
        }
    }

    /// Reset the counter if the record belongs to another day.
    ///
    /// Returns true when the record changed and needs to be persisted.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        let today = day_key(today);
        if self.last_reset_date == today {
            return false;
        }
        self.daily_puzzles_used = 0;
        self.last_reset_date = today;
        true
    }

    pub fn premium_status(&self, now: DateTime<Utc>) -> PremiumStatus {
        match (self.is_premium, self.premium_expiry) {
            (true, Some(expires_at)) if expires_at > now => PremiumStatus::Active { expires_at },
            (true, Some(expired_at)) => PremiumStatus::Expired { expired_at },
            _ => PremiumStatus::Inactive,
        }
    }

    pub fn is_premium_active(&self, now: DateTime<Utc>) -> bool {
        self.premium_status(now).is_enabled()
    }

    /// Free puzzles left today, or [`UNLIMITED`] while premium is active.
    pub fn remaining_puzzles(&self, now: DateTime<Utc>) -> i64 {
        if self.is_premium_active(now) {
            return UNLIMITED;
        }
        i64::from(FREE_DAILY_PUZZLES.saturating_sub(self.daily_puzzles_used))
    }

    pub fn play_decision(&self, now: DateTime<Utc>) -> PlayDecision {
        if self.is_premium_active(now) || self.daily_puzzles_used < FREE_DAILY_PUZZLES {
            PlayDecision::allow()
        } else {
            PlayDecision::deny(format!(
                "Daily limit reached! You've played {} puzzles today. \
                 Upgrade to Premium for unlimited puzzles.",
                FREE_DAILY_PUZZLES
            ))
        }
    }

    pub fn capabilities(&self, now: DateTime<Utc>) -> Capabilities {
        if self.is_premium_active(now) {
            Capabilities::premium()
        } else {
            Capabilities::free()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PremiumStatus {
    #[serde(rename_all = "camelCase")]
    Active { expires_at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    Expired { expired_at: DateTime<Utc> },
    Inactive,
}

impl PremiumStatus {
    pub fn is_enabled(&self) -> bool {
        matches!(self, PremiumStatus::Active { .. })
    }
}

/// Length of a premium subscription purchase.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PremiumDuration {
    #[default]
    Month,
    Year,
}

impl PremiumDuration {
    fn months(&self) -> Months {
        match self {
            PremiumDuration::Month => Months::new(1),
            PremiumDuration::Year => Months::new(12),
        }
    }

    /// Calendar arithmetic; the day clamps to the end of shorter months.
    pub fn expiry_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start
            .checked_add_months(self.months())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl std::fmt::Display for PremiumDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PremiumDuration::Month => write!(f, "month"),
            PremiumDuration::Year => write!(f, "year"),
        }
    }
}

impl std::str::FromStr for PremiumDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" | "monthly" | "1m" => Ok(PremiumDuration::Month),
            "year" | "yearly" | "annual" | "1y" => Ok(PremiumDuration::Year),
            other => Err(format!("Unknown premium duration: {}", other)),
        }
    }
}

/// Outcome of a quota check before starting a puzzle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PlayDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Feature flags shown on the premium screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PremiumFeatures {
    pub unlimited_puzzles: bool,
    pub all_categories: bool,
    pub no_ads: bool,
    pub custom_puzzles: bool,
    pub offline_mode: bool,
}

impl From<&Capabilities> for PremiumFeatures {
    fn from(caps: &Capabilities) -> Self {
        Self {
            unlimited_puzzles: caps.has(Capability::UnlimitedPuzzles),
            all_categories: caps.has(Capability::AllCategories),
            no_ads: caps.has(Capability::NoAds),
            custom_puzzles: caps.has(Capability::CustomPuzzles),
            offline_mode: caps.has(Capability::OfflineMode),
        }
    }
}
