//! Capability model for premium feature gating.
//!
//! A capability set is derived from the entitlement record on every check;
//! nothing here is persisted.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    UnlimitedPuzzles,
    AllCategories,
    NoAds,
    CustomPuzzles,
    OfflineMode,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::UnlimitedPuzzles,
        Capability::AllCategories,
        Capability::NoAds,
        Capability::CustomPuzzles,
        Capability::OfflineMode,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    enabled: HashSet<Capability>,
}

impl Capabilities {
    /// Free tier: no premium capabilities.
    pub fn free() -> Self {
        Self::default()
    }

    /// Active subscription: every capability.
    pub fn premium() -> Self {
        Self {
            enabled: Capability::ALL.into_iter().collect(),
        }
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.enabled.contains(&cap)
    }
}
