//! Categories and per-category entity keys.

use serde::{Deserialize, Serialize};

/// One of the three tracked dimensions of the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Items to be acquired
    Items,
    /// Creature kinds to be killed
    Creatures,
    /// Milestones to be unlocked
    Milestones,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 3] = [Category::Items, Category::Creatures, Category::Milestones];

    /// Stable string form, also used as the snapshot namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Items => "items",
            Category::Creatures => "creatures",
            Category::Milestones => "milestones",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "items" => Ok(Category::Items),
            "creatures" => Ok(Category::Creatures),
            "milestones" => Ok(Category::Milestones),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Bound for keys a progress tracker can manage.
///
/// Keys are opaque and stable; equality and hashing are by value. The `Ord`
/// bound gives `remaining()` a deterministic listing order.
pub trait EntityKey:
    Clone
    + Eq
    + std::hash::Hash
    + Ord
    + std::fmt::Display
    + Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> EntityKey for T where
    T: Clone
        + Eq
        + std::hash::Hash
        + Ord
        + std::fmt::Display
        + Serialize
        + serde::de::DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

macro_rules! entity_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from its stable string form.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// The stable string form.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

entity_key! {
    /// Key for an acquirable item kind.
    ItemKind
}

entity_key! {
    /// Key for a killable creature kind.
    CreatureKind
}

entity_key! {
    /// Key for an unlockable milestone.
    MilestoneKey
}
