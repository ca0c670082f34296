//! Stat module.
//!
//! A [`Stat`] is a base value plus a [`ModifierSet`]. The derived value is
//! recomputed from the base after every mutation, so it is always
//! `modifiers.apply(base)` when observed. Optional bounds clamp the value at
//! read time, after the pipeline.
//!
//! A [`ResourceStat`] adds a depletable current value (health, mana) that
//! always stays within `[0, value]`.

use crate::breakdown::StatBreakdown;
use crate::category::StatCategory;
use crate::error::CombatError;
use crate::modifier::{Modifier, ModifierHandle, ModifierSet};
use crate::numeric::{StatValue, ValueKind};
use serde::{Deserialize, Serialize};

/// Inclusive bounds applied to a stat's value at read time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBounds {
    pub min: StatValue,
    pub max: StatValue,
}

/// A named attribute with a base value and modifiers.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Modifier, Stat, StatCategory, StatValue};
///
/// let mut hp = Stat::new(StatCategory::health(), 10);
/// let belt = hp.add_modifier(Modifier::flat(5, "belt")).unwrap();
/// assert_eq!(hp.value(), StatValue::Int(15));
///
/// hp.set_base_value(20).unwrap();
/// assert_eq!(hp.value(), StatValue::Int(25));
///
/// hp.remove_modifier(belt);
/// assert_eq!(hp.value(), StatValue::Int(20));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    category: StatCategory,
    base: StatValue,
    modifiers: ModifierSet,
    cached: StatValue,
    bounds: Option<StatBounds>,
}

impl Stat {
    /// Create a stat whose value kind is that of `base`.
    pub fn new(category: StatCategory, base: impl Into<StatValue>) -> Self {
        let base = base.into();
        Self {
            category,
            base,
            modifiers: ModifierSet::for_kind(base.kind()),
            cached: base,
            bounds: None,
        }
    }

    /// Create a stat of a declared kind, coercing `base` into it.
    pub fn with_kind(
        category: StatCategory,
        kind: ValueKind,
        base: impl Into<StatValue>,
    ) -> Result<Self, CombatError> {
        Ok(Self::new(category, base.into().coerce(kind)?))
    }

    /// Add read-time bounds.
    ///
    /// # Errors
    ///
    /// `ValueKindMismatch` if a bound is not of the stat's kind, or if the
    /// stat is boolean.
    pub fn with_bounds(
        mut self,
        min: impl Into<StatValue>,
        max: impl Into<StatValue>,
    ) -> Result<Self, CombatError> {
        let kind = self.kind();
        if !kind.is_numeric() {
            return Err(CombatError::ValueKindMismatch {
                expected: ValueKind::Int,
                found: kind,
            });
        }
        self.bounds = Some(StatBounds {
            min: min.into().coerce(kind)?,
            max: max.into().coerce(kind)?,
        });
        Ok(self)
    }

    pub fn category(&self) -> &StatCategory {
        &self.category
    }

    pub fn kind(&self) -> ValueKind {
        self.modifiers.value_kind()
    }

    pub fn bounds(&self) -> Option<StatBounds> {
        self.bounds
    }

    pub fn modifiers(&self) -> &ModifierSet {
        &self.modifiers
    }

    /// The derived value, clamped to the bounds if any.
    pub fn value(&self) -> StatValue {
        match self.bounds {
            Some(b) => self.cached.clamp_to(b.min, b.max),
            None => self.cached,
        }
    }

    pub fn base_value(&self) -> StatValue {
        self.base
    }

    /// Replace the base value and recompute.
    pub fn set_base_value(&mut self, base: impl Into<StatValue>) -> Result<(), CombatError> {
        self.base = base.into().coerce(self.kind())?;
        self.recompute();
        Ok(())
    }

    pub fn add_modifier(&mut self, modifier: Modifier) -> Result<ModifierHandle, CombatError> {
        let handle = self.modifiers.add(modifier)?;
        self.recompute();
        Ok(handle)
    }

    pub fn remove_modifier(&mut self, handle: ModifierHandle) -> Option<Modifier> {
        let removed = self.modifiers.remove(handle);
        self.recompute();
        removed
    }

    pub fn remove_all_modifiers_from(&mut self, source: &str) -> usize {
        let removed = self.modifiers.remove_all_from(source);
        self.recompute();
        removed
    }

    /// Drop every modifier, leaving the base value.
    pub fn reset_value(&mut self) {
        self.modifiers.clear();
        self.recompute();
    }

    pub fn breakdown(&self) -> StatBreakdown {
        let (unbounded, steps) = self.modifiers.apply_traced(self.base);
        StatBreakdown {
            category: self.category.clone(),
            base: self.base,
            steps,
            unbounded,
            value: self.value(),
        }
    }

    fn recompute(&mut self) {
        self.cached = self.modifiers.apply(self.base);
    }
}

/// A stat with a depletable current value.
///
/// The stat's value is the maximum. The current value is re-clamped into
/// `[0, value]` whenever either side changes.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Modifier, ResourceStat, Stat, StatCategory, StatValue};
///
/// let mut hp = ResourceStat::new(Stat::new(StatCategory::health(), 20)).unwrap();
/// hp.modify_current_value(-25).unwrap();
/// assert_eq!(hp.current_value(), StatValue::Int(0));
///
/// hp.modify_current_value(30).unwrap();
/// assert_eq!(hp.current_value(), StatValue::Int(20));
///
/// hp.add_modifier(Modifier::clamp_ceiling(12, "wound")).unwrap();
/// assert_eq!(hp.current_value(), StatValue::Int(12));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceStat {
    stat: Stat,
    current: StatValue,
}

impl ResourceStat {
    /// Wrap a numeric stat. The current value starts full.
    pub fn new(stat: Stat) -> Result<Self, CombatError> {
        let kind = stat.kind();
        if !kind.is_numeric() {
            return Err(CombatError::ValueKindMismatch {
                expected: ValueKind::Int,
                found: kind,
            });
        }
        let current = stat.value();
        let mut resource = Self { stat, current };
        resource.clamp_current();
        Ok(resource)
    }

    pub fn stat(&self) -> &Stat {
        &self.stat
    }

    /// The derived maximum.
    pub fn value(&self) -> StatValue {
        self.stat.value()
    }

    pub fn current_value(&self) -> StatValue {
        self.current
    }

    /// Add `delta` to the current value and clamp. Returns the new value.
    pub fn modify_current_value(
        &mut self,
        delta: impl Into<StatValue>,
    ) -> Result<StatValue, CombatError> {
        let delta = delta.into().coerce(self.stat.kind())?;
        self.current = self.current.checked_add(delta)?;
        self.clamp_current();
        Ok(self.current)
    }

    /// Set the current value directly, then clamp.
    pub fn set_current_value(&mut self, value: impl Into<StatValue>) -> Result<(), CombatError> {
        self.current = value.into().coerce(self.stat.kind())?;
        self.clamp_current();
        Ok(())
    }

    /// Refill to the maximum.
    pub fn restore(&mut self) {
        self.current = self.stat.value();
        self.clamp_current();
    }

    pub fn set_base_value(&mut self, base: impl Into<StatValue>) -> Result<(), CombatError> {
        self.stat.set_base_value(base)?;
        self.clamp_current();
        Ok(())
    }

    pub fn add_modifier(&mut self, modifier: Modifier) -> Result<ModifierHandle, CombatError> {
        let handle = self.stat.add_modifier(modifier)?;
        self.clamp_current();
        Ok(handle)
    }

    pub fn remove_modifier(&mut self, handle: ModifierHandle) -> Option<Modifier> {
        let removed = self.stat.remove_modifier(handle);
        self.clamp_current();
        removed
    }

    pub fn remove_all_modifiers_from(&mut self, source: &str) -> usize {
        let removed = self.stat.remove_all_modifiers_from(source);
        self.clamp_current();
        removed
    }

    pub fn reset_value(&mut self) {
        self.stat.reset_value();
        self.clamp_current();
    }

    fn clamp_current(&mut self) {
        let zero = StatValue::zero(self.stat.kind());
        self.current = self.current.max_of(zero).min_of(self.stat.value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strength(base: i32) -> Stat {
        Stat::new(StatCategory::from_str("STR"), base)
    }

    #[test]
    fn test_flat_modifier() {
        let mut stat = strength(10);
        stat.add_modifier(Modifier::flat(5, "s")).unwrap();
        assert_eq!(stat.value(), StatValue::Int(15));
    }

    #[test]
    fn test_percentage_modifier() {
        let mut stat = strength(10);
        stat.add_modifier(Modifier::percentage(50, "s")).unwrap();
        assert_eq!(stat.value(), StatValue::Int(15));
    }

    #[test]
    fn test_flat_then_percentage() {
        let mut stat = strength(10);
        stat.add_modifier(Modifier::flat(5, "s")).unwrap();
        stat.add_modifier(Modifier::percentage(100, "s")).unwrap();
        assert_eq!(stat.value(), StatValue::Int(30));
    }

    #[test]
    fn test_setter_flat_percentage() {
        let mut stat = strength(10);
        stat.add_modifier(Modifier::flat(5, "s")).unwrap();
        stat.add_modifier(Modifier::percentage(100, "s")).unwrap();
        stat.add_modifier(Modifier::setter(30, "s")).unwrap();
        assert_eq!(stat.value(), StatValue::Int(70));
    }

    #[test]
    fn test_remove_by_source() {
        let mut stat = strength(10);
        stat.add_modifier(Modifier::flat(2, "ring")).unwrap();
        stat.add_modifier(Modifier::flat(1, "belt")).unwrap();
        stat.add_modifier(Modifier::percentage(200, "ring")).unwrap();
        assert_eq!(stat.value(), StatValue::Int(39));
        assert_eq!(stat.remove_all_modifiers_from("ring"), 2);
        assert_eq!(stat.value(), StatValue::Int(11));
    }

    #[test]
    fn test_reset_value() {
        let mut stat = strength(10);
        stat.add_modifier(Modifier::flat(5, "s")).unwrap();
        stat.add_modifier(Modifier::clamp_ceiling(3, "t")).unwrap();
        stat.reset_value();
        assert_eq!(stat.value(), StatValue::Int(10));
        assert!(stat.modifiers().is_empty());
    }

    #[test]
    fn test_bounds_apply_at_read() {
        let mut stat = strength(10).with_bounds(0, 20).unwrap();
        stat.add_modifier(Modifier::flat(50, "s")).unwrap();
        assert_eq!(stat.value(), StatValue::Int(20));
        stat.add_modifier(Modifier::flat(-100, "t")).unwrap();
        assert_eq!(stat.value(), StatValue::Int(0));
    }

    #[test]
    fn test_bool_stat_cannot_be_bounded() {
        let flag = Stat::new(StatCategory::from_str("Flying"), false);
        assert!(flag.with_bounds(false, true).is_err());
    }

    #[test]
    fn test_base_value_kind_checked() {
        let mut stat = strength(10);
        assert!(stat.set_base_value(1.5).is_err());
        assert_eq!(stat.base_value(), StatValue::Int(10));
        let mut speed = Stat::with_kind(StatCategory::from_str("Speed"), ValueKind::Float, 6)
            .unwrap();
        speed.set_base_value(7).unwrap();
        assert_eq!(speed.value(), StatValue::Float(7.0));
    }

    #[test]
    fn test_resource_stays_in_range() {
        let mut hp = ResourceStat::new(Stat::new(StatCategory::health(), 30)).unwrap();
        for delta in [-7, 50, -100, 12, -3] {
            hp.modify_current_value(delta).unwrap();
            let current = hp.current_value().to_i32().unwrap();
            assert!((0..=30).contains(&current));
        }
        assert_eq!(hp.current_value(), StatValue::Int(9));
    }

    #[test]
    fn test_resource_reclamps_when_maximum_drops() {
        let mut hp = ResourceStat::new(Stat::new(StatCategory::health(), 30)).unwrap();
        let curse = hp.add_modifier(Modifier::percentage(-50, "curse")).unwrap();
        assert_eq!(hp.current_value(), StatValue::Int(15));
        hp.remove_modifier(curse);
        assert_eq!(hp.value(), StatValue::Int(30));
        assert_eq!(hp.current_value(), StatValue::Int(15));
        hp.set_base_value(10).unwrap();
        assert_eq!(hp.current_value(), StatValue::Int(10));
    }

    #[test]
    fn test_resource_rejects_bool() {
        let stat = Stat::new(StatCategory::from_str("Alive"), true);
        assert!(ResourceStat::new(stat).is_err());
    }
}
