//! Stat category module.
//!
//! Provides the `StatCategory` type, an interned string identifier under
//! which stats are registered. Uses `Arc<str>` for memory efficiency and
//! fast comparison.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Interned string identifier for a stat category.
///
/// Categories are open: any string works. The handful the combat core reads
/// itself (armor class, attack bonus, health, regeneration) have named
/// constructors.
///
/// # Examples
///
/// ```rust
/// use zzcombat::StatCategory;
///
/// let ac = StatCategory::from_str("AC");
/// let ac2: StatCategory = "AC".into();
///
/// assert_eq!(ac, ac2);
/// assert_eq!(ac, StatCategory::armor_class());
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatCategory(Arc<str>);

impl Serialize for StatCategory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(StatCategory::from(s))
    }
}

impl StatCategory {
    /// Create a new `StatCategory` from a string slice.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the string representation of this category.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Armor class, the target number of attack rolls.
    pub fn armor_class() -> Self {
        Self::from_str("AC")
    }

    /// Bonus added to attack rolls.
    pub fn attack_bonus() -> Self {
        Self::from_str("AttackBonus")
    }

    /// Maximum health.
    pub fn health() -> Self {
        Self::from_str("Health")
    }

    /// Health restored per regeneration tick.
    pub fn regeneration() -> Self {
        Self::from_str("Regeneration")
    }
}

impl From<&str> for StatCategory {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for StatCategory {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for StatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
