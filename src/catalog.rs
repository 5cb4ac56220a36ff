//! Puzzle categories and which of them the free tier can open.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    /// Playable without a subscription.
    pub free: bool,
}

pub const CATEGORIES: &[Category] = &[
    Category {
        id: "animals",
        name: "Animals",
        icon: "🐾",
        free: true,
    },
    Category {
        id: "nature",
        name: "Nature",
        icon: "🌿",
        free: true,
    },
    Category {
        id: "food",
        name: "Food",
        icon: "🍎",
        free: true,
    },
    Category {
        id: "objects",
        name: "Objects",
        icon: "📱",
        free: false,
    },
    Category {
        id: "vehicles",
        name: "Vehicles",
        icon: "🚗",
        free: false,
    },
    Category {
        id: "buildings",
        name: "Buildings",
        icon: "🏢",
        free: false,
    },
];

pub fn category_by_id(id: &str) -> Option<&'static Category> {
    let trimmed = id.trim();
    CATEGORIES
        .iter()
        .find(|entry| entry.id.eq_ignore_ascii_case(trimmed))
}

pub fn is_free_category(id: &str) -> bool {
    category_by_id(id).is_some_and(|entry| entry.free)
}
