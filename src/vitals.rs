//! Vitals and resistances.
//!
//! Vitals hold an entity's health resource and optional regeneration.
//! Resistances reduce incoming damage per [`DamageType`].

use crate::category::StatCategory;
use crate::error::CombatError;
use crate::modifier::{Modifier, ModifierHandle};
use crate::numeric::StatValue;
use crate::stat::{ResourceStat, Stat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of damage, used to pick the receiver's resistance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DamageType {
    Physical,
    Magical,
    True,
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DamageType::Physical => "physical",
            DamageType::Magical => "magical",
            DamageType::True => "true",
        };
        f.write_str(name)
    }
}

/// Health and regeneration of an entity.
///
/// # Examples
///
/// ```rust
/// use zzcombat::Vitals;
///
/// let mut vitals = Vitals::with_health(20).unwrap().with_regeneration(3);
/// vitals.take_damage(18).unwrap();
/// assert_eq!(vitals.current_health(), 2);
///
/// vitals.regenerate().unwrap();
/// assert_eq!(vitals.current_health(), 5);
/// assert!(!vitals.is_knocked_out());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Vitals {
    health: ResourceStat,
    regeneration: Option<Stat>,
}

impl Vitals {
    pub fn new(health: ResourceStat) -> Self {
        Self {
            health,
            regeneration: None,
        }
    }

    /// Vitals with an integer health pool, starting full.
    pub fn with_health(max_health: i32) -> Result<Self, CombatError> {
        Ok(Self::new(ResourceStat::new(Stat::new(
            StatCategory::health(),
            max_health,
        ))?))
    }

    pub fn with_regeneration(mut self, per_tick: i32) -> Self {
        self.regeneration = Some(Stat::new(StatCategory::regeneration(), per_tick));
        self
    }

    pub fn health(&self) -> &ResourceStat {
        &self.health
    }

    pub fn health_mut(&mut self) -> &mut ResourceStat {
        &mut self.health
    }

    pub fn regeneration(&self) -> Option<&Stat> {
        self.regeneration.as_ref()
    }

    pub fn regeneration_mut(&mut self) -> Option<&mut Stat> {
        self.regeneration.as_mut()
    }

    /// Current health as an integer (floats truncate).
    pub fn current_health(&self) -> i32 {
        self.health.current_value().to_i32().unwrap_or(0)
    }

    /// Maximum health as an integer (floats truncate).
    pub fn max_health(&self) -> i32 {
        self.health.value().to_i32().unwrap_or(0)
    }

    pub fn take_damage(&mut self, amount: i32) -> Result<StatValue, CombatError> {
        self.health.modify_current_value(amount.saturating_neg())
    }

    pub fn take_heal(&mut self, amount: i32) -> Result<StatValue, CombatError> {
        self.health.modify_current_value(amount)
    }

    /// Restore one tick of regeneration. Without a regeneration stat this
    /// is a no-op.
    pub fn regenerate(&mut self) -> Result<StatValue, CombatError> {
        match &self.regeneration {
            Some(regen) => {
                let amount = regen.value().to_i32().unwrap_or(0);
                self.health.modify_current_value(amount)
            }
            None => Ok(self.health.current_value()),
        }
    }

    pub fn is_knocked_out(&self) -> bool {
        match self.health.current_value().to_f64() {
            Some(v) => v <= 0.0,
            None => true,
        }
    }
}

/// Per-damage-type resistance stats. A missing type resists nothing.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{DamageType, Resistances};
///
/// let res = Resistances::new().with(DamageType::Physical, 3);
/// assert_eq!(res.resistance(DamageType::Physical), 3);
/// assert_eq!(res.resistance(DamageType::Magical), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resistances {
    stats: BTreeMap<DamageType, Stat>,
}

impl Resistances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form. Replaces any resistance already set for the type.
    pub fn with(mut self, damage_type: DamageType, amount: i32) -> Self {
        self.stats
            .insert(damage_type, Self::resistance_stat(damage_type, amount));
        self
    }

    fn resistance_stat(damage_type: DamageType, amount: i32) -> Stat {
        Stat::new(
            StatCategory::from(format!("Resistance.{}", damage_type)),
            amount,
        )
    }

    /// Set the base resistance for a type, keeping existing modifiers.
    pub fn set(&mut self, damage_type: DamageType, amount: i32) -> Result<(), CombatError> {
        match self.stats.get_mut(&damage_type) {
            Some(stat) => stat.set_base_value(amount),
            None => {
                self.stats
                    .insert(damage_type, Self::resistance_stat(damage_type, amount));
                Ok(())
            }
        }
    }

    /// Current resistance against `damage_type`.
    pub fn resistance(&self, damage_type: DamageType) -> i32 {
        self.stats
            .get(&damage_type)
            .and_then(|s| s.value().to_i32())
            .unwrap_or(0)
    }

    pub fn stat(&self, damage_type: DamageType) -> Option<&Stat> {
        self.stats.get(&damage_type)
    }

    pub fn add_modifier(
        &mut self,
        damage_type: DamageType,
        modifier: Modifier,
    ) -> Result<ModifierHandle, CombatError> {
        let stat = self
            .stats
            .entry(damage_type)
            .or_insert_with(|| Self::resistance_stat(damage_type, 0));
        stat.add_modifier(modifier)
    }

    pub fn remove_all_modifiers_from(&mut self, source: &str) -> usize {
        self.stats
            .values_mut()
            .map(|s| s.remove_all_modifiers_from(source))
            .sum()
    }
}
