//! Characters and their capability table.
//!
//! A [`Character`] carries an explicit set of optional components (stats,
//! vitals, resistances, actions). Systems ask for a component and get a
//! `MissingCapability` error when it is absent, which action traversal
//! treats as "skip this target".

use crate::action::GameAction;
use crate::category::StatCategory;
use crate::entity::{EntityId, Target};
use crate::error::CombatError;
use crate::grid::Tile;
use crate::numeric::StatValue;
use crate::registry::StatsRegistry;
use crate::status::StatusEffect;
use crate::vitals::{Resistances, Vitals};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A component a character may or may not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Stats,
    Vitals,
    /// Vitals plus resistances: the entity can be damaged and healed.
    DamageReceiver,
    Actions,
    Position,
}

/// A combatant.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Capability, Character, Resistances, Vitals};
///
/// let barrel = Character::new("barrel", "Barrel");
/// assert!(!barrel.has(Capability::DamageReceiver));
///
/// let goblin = Character::new("goblin", "Goblin")
///     .with_vitals(Vitals::with_health(7).unwrap())
///     .with_resistances(Resistances::new());
/// assert!(goblin.has(Capability::DamageReceiver));
/// assert!(goblin.is_alive());
/// ```
#[derive(Debug, Clone)]
pub struct Character {
    id: EntityId,
    name: String,
    team: Option<String>,
    tile: Option<Tile>,
    stats: Option<StatsRegistry>,
    vitals: Option<Vitals>,
    resistances: Option<Resistances>,
    actions: Option<Vec<Arc<GameAction>>>,
    effects: BTreeMap<String, StatusEffect>,
}

impl Character {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            team: None,
            tile: None,
            stats: None,
            vitals: None,
            resistances: None,
            actions: None,
            effects: BTreeMap::new(),
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn with_tile(mut self, tile: Tile) -> Self {
        self.tile = Some(tile);
        self
    }

    pub fn with_stats(mut self, stats: StatsRegistry) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_vitals(mut self, vitals: Vitals) -> Self {
        self.vitals = Some(vitals);
        self
    }

    pub fn with_resistances(mut self, resistances: Resistances) -> Self {
        self.resistances = Some(resistances);
        self
    }

    pub fn with_actions(mut self, actions: Vec<Arc<GameAction>>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn team(&self) -> Option<&str> {
        self.team.as_deref()
    }

    /// Whether `other` is this character or shares its team.
    pub fn is_ally_of(&self, other: &Character) -> bool {
        self.id == other.id || (self.team.is_some() && self.team == other.team)
    }

    pub fn tile(&self) -> Option<Tile> {
        self.tile
    }

    pub fn set_tile(&mut self, tile: Option<Tile>) {
        self.tile = tile;
    }

    /// This character as an action target.
    pub fn as_target(&self) -> Target {
        Target {
            entity: self.id.clone(),
            tile: self.tile,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Stats => self.stats.is_some(),
            Capability::Vitals => self.vitals.is_some(),
            Capability::DamageReceiver => self.vitals.is_some() && self.resistances.is_some(),
            Capability::Actions => self.actions.is_some(),
            Capability::Position => self.tile.is_some(),
        }
    }

    fn missing(&self, capability: Capability) -> CombatError {
        CombatError::MissingCapability {
            entity: self.id.clone(),
            capability,
        }
    }

    pub fn stats(&self) -> Result<&StatsRegistry, CombatError> {
        self.stats
            .as_ref()
            .ok_or_else(|| self.missing(Capability::Stats))
    }

    pub fn stats_mut(&mut self) -> Result<&mut StatsRegistry, CombatError> {
        match self.stats.as_mut() {
            Some(stats) => Ok(stats),
            None => Err(CombatError::MissingCapability {
                entity: self.id.clone(),
                capability: Capability::Stats,
            }),
        }
    }

    pub fn vitals(&self) -> Result<&Vitals, CombatError> {
        self.vitals
            .as_ref()
            .ok_or_else(|| self.missing(Capability::Vitals))
    }

    pub fn vitals_mut(&mut self) -> Result<&mut Vitals, CombatError> {
        match self.vitals.as_mut() {
            Some(vitals) => Ok(vitals),
            None => Err(CombatError::MissingCapability {
                entity: self.id.clone(),
                capability: Capability::Vitals,
            }),
        }
    }

    pub fn resistances(&self) -> Result<&Resistances, CombatError> {
        self.resistances
            .as_ref()
            .ok_or_else(|| self.missing(Capability::DamageReceiver))
    }

    pub fn resistances_mut(&mut self) -> Result<&mut Resistances, CombatError> {
        match self.resistances.as_mut() {
            Some(resistances) => Ok(resistances),
            None => Err(CombatError::MissingCapability {
                entity: self.id.clone(),
                capability: Capability::DamageReceiver,
            }),
        }
    }

    /// Fail unless the character can receive damage and healing.
    pub fn require_damage_receiver(&self) -> Result<(), CombatError> {
        if self.has(Capability::DamageReceiver) {
            Ok(())
        } else {
            Err(self.missing(Capability::DamageReceiver))
        }
    }

    pub fn actions(&self) -> Result<&[Arc<GameAction>], CombatError> {
        self.actions
            .as_deref()
            .ok_or_else(|| self.missing(Capability::Actions))
    }

    /// Value of a registered stat.
    pub fn stat_value(&self, category: &StatCategory) -> Result<StatValue, CombatError> {
        self.stats()?.value(category)
    }

    /// Alive unless vitals say knocked out. Characters without vitals
    /// cannot be downed.
    pub fn is_alive(&self) -> bool {
        self.vitals.as_ref().map_or(true, |v| !v.is_knocked_out())
    }

    /// Apply a status effect, replacing an active instance with the same id.
    ///
    /// Modifiers on [`StatCategory::health`] go to the health pool when the
    /// stats registry has no such stat. The operation is atomic: if any
    /// modifier is rejected, stats and vitals are left as they were.
    pub fn apply_effect(&mut self, effect: &StatusEffect) -> Result<(), CombatError> {
        if !self.has(Capability::Stats) {
            return Err(self.missing(Capability::Stats));
        }
        let snapshot = (self.stats.clone(), self.vitals.clone());
        if self.effects.contains_key(&effect.id) {
            self.strip_modifiers(&effect.id);
        }

        if let Err(err) = self.add_effect_modifiers(effect) {
            (self.stats, self.vitals) = snapshot;
            return Err(err);
        }
        debug!(entity = %self.id, effect = %effect.id, "status effect applied");
        self.effects.insert(effect.id.clone(), effect.clone());
        Ok(())
    }

    /// Remove an active status effect. Returns whether it was active.
    pub fn remove_effect(&mut self, id: &str) -> bool {
        if self.effects.remove(id).is_none() {
            return false;
        }
        self.strip_modifiers(id);
        debug!(entity = %self.id, effect = id, "status effect removed");
        true
    }

    pub fn has_effect(&self, id: &str) -> bool {
        self.effects.contains_key(id)
    }

    pub fn active_effects(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.values()
    }

    fn add_effect_modifiers(&mut self, effect: &StatusEffect) -> Result<(), CombatError> {
        for (category, modifier) in effect.modifiers_tagged() {
            let stats = self.stats_mut()?;
            if stats.contains(category) {
                stats.add_modifier(category, modifier)?;
                continue;
            }
            match self.vitals.as_mut() {
                Some(vitals) if *category == StatCategory::health() => {
                    vitals.health_mut().add_modifier(modifier)?;
                }
                _ => return Err(CombatError::MissingStat(category.clone())),
            }
        }
        Ok(())
    }

    fn strip_modifiers(&mut self, source: &str) {
        if let Some(stats) = self.stats.as_mut() {
            stats.remove_all_modifiers_from(source);
        }
        if let Some(vitals) = self.vitals.as_mut() {
            vitals.health_mut().remove_all_modifiers_from(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{Modifier, ModifierKind};
    use crate::stat::Stat;

    fn fighter() -> Character {
        let stats: StatsRegistry = [
            Stat::new(StatCategory::armor_class(), 15),
            Stat::new(StatCategory::attack_bonus(), 5),
        ]
        .into_iter()
        .collect();
        Character::new("fighter", "Fighter")
            .with_stats(stats)
            .with_vitals(Vitals::with_health(30).unwrap())
            .with_resistances(Resistances::new())
    }

    #[test]
    fn test_missing_capability_is_recoverable() {
        let rock = Character::new("rock", "Rock");
        let err = rock.vitals().unwrap_err();
        assert!(err.is_recoverable());
        assert!(rock.stat_value(&StatCategory::armor_class()).is_err());
    }

    #[test]
    fn test_apply_and_remove_effect() {
        let mut c = fighter();
        let bless = StatusEffect::new("bless")
            .with_modifier(StatCategory::attack_bonus(), ModifierKind::Flat { value: 2.into() })
            .with_modifier(StatCategory::health(), Modifier::flat(10, "").kind);
        c.apply_effect(&bless).unwrap();
        assert_eq!(
            c.stat_value(&StatCategory::attack_bonus()).unwrap(),
            StatValue::Int(7)
        );
        assert_eq!(c.vitals().unwrap().max_health(), 40);

        // Re-applying replaces instead of stacking.
        c.apply_effect(&bless).unwrap();
        assert_eq!(
            c.stat_value(&StatCategory::attack_bonus()).unwrap(),
            StatValue::Int(7)
        );

        assert!(c.remove_effect("bless"));
        assert!(!c.remove_effect("bless"));
        assert_eq!(
            c.stat_value(&StatCategory::attack_bonus()).unwrap(),
            StatValue::Int(5)
        );
        assert_eq!(c.vitals().unwrap().max_health(), 30);
    }

    #[test]
    fn test_apply_effect_rolls_back_on_failure() {
        let mut c = fighter();
        let broken = StatusEffect::new("broken")
            .with_modifier(StatCategory::armor_class(), Modifier::flat(3, "").kind)
            .with_modifier(StatCategory::from_str("Luck"), Modifier::flat(1, "").kind);
        let err = c.apply_effect(&broken).unwrap_err();
        assert_eq!(err, CombatError::MissingStat(StatCategory::from_str("Luck")));
        assert_eq!(
            c.stat_value(&StatCategory::armor_class()).unwrap(),
            StatValue::Int(15)
        );
        assert!(!c.has_effect("broken"));
    }

    #[test]
    fn test_allies() {
        let a = Character::new("a", "A").with_team("red");
        let b = Character::new("b", "B").with_team("red");
        let c = Character::new("c", "C").with_team("blue");
        let loner = Character::new("d", "D");
        assert!(a.is_ally_of(&b));
        assert!(!a.is_ally_of(&c));
        assert!(loner.is_ally_of(&loner));
        assert!(!loner.is_ally_of(&Character::new("e", "E")));
    }
}
