//! Stats registry module.
//!
//! Keyed lookup of an entity's stats by category.

use crate::category::StatCategory;
use crate::error::CombatError;
use crate::modifier::{Modifier, ModifierHandle};
use crate::numeric::StatValue;
use crate::stat::Stat;
use std::collections::BTreeMap;

/// An entity's stats, keyed by category.
///
/// Iteration is in category order.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Stat, StatCategory, StatValue, StatsRegistry};
///
/// let mut stats = StatsRegistry::new();
/// assert!(stats.insert(Stat::new(StatCategory::armor_class(), 15)));
/// assert!(!stats.insert(Stat::new(StatCategory::armor_class(), 99)));
///
/// assert_eq!(stats.value(&StatCategory::armor_class()).unwrap(), StatValue::Int(15));
/// assert!(stats.get(&StatCategory::attack_bonus()).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsRegistry {
    stats: BTreeMap<StatCategory, Stat>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stat. A stat already registered under the same category
    /// is kept and the new one is ignored.
    ///
    /// Returns whether the stat was inserted.
    pub fn insert(&mut self, stat: Stat) -> bool {
        if self.stats.contains_key(stat.category()) {
            return false;
        }
        self.stats.insert(stat.category().clone(), stat);
        true
    }

    pub fn remove(&mut self, category: &StatCategory) -> Option<Stat> {
        self.stats.remove(category)
    }

    pub fn contains(&self, category: &StatCategory) -> bool {
        self.stats.contains_key(category)
    }

    /// Look up a stat, failing with `MissingStat`.
    pub fn get(&self, category: &StatCategory) -> Result<&Stat, CombatError> {
        self.stats
            .get(category)
            .ok_or_else(|| CombatError::MissingStat(category.clone()))
    }

    pub fn get_mut(&mut self, category: &StatCategory) -> Result<&mut Stat, CombatError> {
        self.stats
            .get_mut(category)
            .ok_or_else(|| CombatError::MissingStat(category.clone()))
    }

    /// Look up a stat that may legitimately be absent.
    pub fn find(&self, category: &StatCategory) -> Option<&Stat> {
        self.stats.get(category)
    }

    pub fn value(&self, category: &StatCategory) -> Result<StatValue, CombatError> {
        Ok(self.get(category)?.value())
    }

    pub fn add_modifier(
        &mut self,
        category: &StatCategory,
        modifier: Modifier,
    ) -> Result<ModifierHandle, CombatError> {
        self.get_mut(category)?.add_modifier(modifier)
    }

    pub fn remove_modifier(
        &mut self,
        category: &StatCategory,
        handle: ModifierHandle,
    ) -> Option<Modifier> {
        self.stats.get_mut(category)?.remove_modifier(handle)
    }

    /// Remove every modifier from `source` across all stats.
    pub fn remove_all_modifiers_from(&mut self, source: &str) -> usize {
        self.stats
            .values_mut()
            .map(|stat| stat.remove_all_modifiers_from(source))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StatCategory, &Stat)> {
        self.stats.iter()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

impl FromIterator<Stat> for StatsRegistry {
    fn from_iter<I: IntoIterator<Item = Stat>>(iter: I) -> Self {
        let mut registry = Self::new();
        for stat in iter {
            registry.insert(stat);
        }
        registry
    }
}
