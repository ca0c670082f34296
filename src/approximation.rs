//! Action approximation module.
//!
//! An [`ActionApproximation`] is the expected effect of an action: damage and
//! healing per target, plus the probability of each status effect and of a
//! kill. Branches merge additively, scaled by the probability of reaching
//! them. Probabilities are clamped to `[0, 1]` after every merge.

use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Probability-weighted projection of an action's effects.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{ActionApproximation, EntityId};
///
/// let orc = EntityId::from_str("orc");
/// let mut hit = ActionApproximation::default();
/// hit.add_damage(&orc, 9);
/// hit.add_kill_chance(&orc, 1.0);
///
/// let mut total = ActionApproximation::default();
/// total.merge_scaled(&hit, 0.55);
/// assert_eq!(total.damage_to(&orc), 4);
/// assert!((total.kill_chance_of(&orc) - 0.55).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionApproximation {
    pub damage_dealt: BTreeMap<EntityId, i32>,
    pub healing_done: BTreeMap<EntityId, i32>,
    pub effects_applied: BTreeMap<EntityId, BTreeMap<String, f64>>,
    pub kill_chance: BTreeMap<EntityId, f64>,
}

fn add_probability(slot: &mut f64, p: f64) {
    *slot = (*slot + p).clamp(0.0, 1.0);
}

impl ActionApproximation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.damage_dealt.is_empty()
            && self.healing_done.is_empty()
            && self.effects_applied.is_empty()
            && self.kill_chance.is_empty()
    }

    pub fn add_damage(&mut self, target: &EntityId, amount: i32) {
        let slot = self.damage_dealt.entry(target.clone()).or_insert(0);
        *slot = slot.saturating_add(amount);
    }

    pub fn add_healing(&mut self, target: &EntityId, amount: i32) {
        let slot = self.healing_done.entry(target.clone()).or_insert(0);
        *slot = slot.saturating_add(amount);
    }

    pub fn add_effect(&mut self, target: &EntityId, effect: &str, probability: f64) {
        let slot = self
            .effects_applied
            .entry(target.clone())
            .or_default()
            .entry(effect.to_string())
            .or_insert(0.0);
        add_probability(slot, probability);
    }

    pub fn add_kill_chance(&mut self, target: &EntityId, probability: f64) {
        let slot = self.kill_chance.entry(target.clone()).or_insert(0.0);
        add_probability(slot, probability);
    }

    /// Add `other` into `self`.
    pub fn merge(&mut self, other: &ActionApproximation) {
        self.merge_scaled(other, 1.0);
    }

    /// Add `other` scaled by `coefficient`.
    ///
    /// Damage and healing are multiplied and truncated toward zero;
    /// probabilities are multiplied.
    pub fn merge_scaled(&mut self, other: &ActionApproximation, coefficient: f64) {
        for (target, amount) in &other.damage_dealt {
            self.add_damage(target, (*amount as f64 * coefficient) as i32);
        }
        for (target, amount) in &other.healing_done {
            self.add_healing(target, (*amount as f64 * coefficient) as i32);
        }
        for (target, effects) in &other.effects_applied {
            for (effect, p) in effects {
                self.add_effect(target, effect, p * coefficient);
            }
        }
        for (target, p) in &other.kill_chance {
            self.add_kill_chance(target, p * coefficient);
        }
    }

    pub fn damage_to(&self, target: &EntityId) -> i32 {
        self.damage_dealt.get(target).copied().unwrap_or(0)
    }

    pub fn healing_to(&self, target: &EntityId) -> i32 {
        self.healing_done.get(target).copied().unwrap_or(0)
    }

    pub fn effect_chance(&self, target: &EntityId, effect: &str) -> f64 {
        self.effects_applied
            .get(target)
            .and_then(|e| e.get(effect))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn kill_chance_of(&self, target: &EntityId) -> f64 {
        self.kill_chance.get(target).copied().unwrap_or(0.0)
    }

    pub fn total_damage(&self) -> i64 {
        self.damage_dealt.values().map(|d| *d as i64).sum()
    }
}
