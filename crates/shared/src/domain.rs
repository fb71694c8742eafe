use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryKey(pub String);

impl CategoryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A storefront category as held by the category store.
///
/// `sort_order` is the display position. After a successful reorder the
/// position of a record in the loaded list equals its `sort_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: CategoryKey,
    pub label: String,
    pub icon: String,
    pub sort_order: i64,
    #[serde(default)]
    pub is_system: bool,
}

impl Category {
    pub fn icon(&self) -> Icon {
        Icon::from_key(&self.icon)
    }

    /// System categories stay in the list; the admin surface refuses to delete them.
    pub fn is_deletable(&self) -> bool {
        !self.is_system
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    Grid,
    Tag,
    Shirt,
    Shoe,
    Watch,
    Gift,
    Star,
    Home,
    Sparkles,
}

impl Icon {
    pub const ALL: [Icon; 9] = [
        Icon::Grid,
        Icon::Tag,
        Icon::Shirt,
        Icon::Shoe,
        Icon::Watch,
        Icon::Gift,
        Icon::Star,
        Icon::Home,
        Icon::Sparkles,
    ];

    /// Unknown keys fall back to [`Icon::Grid`].
    pub fn from_key(key: &str) -> Self {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|icon| icon.key().eq_ignore_ascii_case(key))
            .unwrap_or(Icon::Grid)
    }

    pub fn key(self) -> &'static str {
        match self {
            Icon::Grid => "grid",
            Icon::Tag => "tag",
            Icon::Shirt => "shirt",
            Icon::Shoe => "shoe",
            Icon::Watch => "watch",
            Icon::Gift => "gift",
            Icon::Star => "star",
            Icon::Home => "home",
            Icon::Sparkles => "sparkles",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Icon::Grid => "▦",
            Icon::Tag => "🏷",
            Icon::Shirt => "👕",
            Icon::Shoe => "👟",
            Icon::Watch => "⌚",
            Icon::Gift => "🎁",
            Icon::Star => "★",
            Icon::Home => "⌂",
            Icon::Sparkles => "✨",
        }
    }
}
