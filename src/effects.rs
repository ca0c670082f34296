//! Node effects: what a node does to each of its targets.

use crate::approximation::ActionApproximation;
use crate::category::StatCategory;
use crate::context::ActionContext;
use crate::damage::{modify_damage, modify_healing, receive_damage, receive_healing};
use crate::damage::{DamageContext, HealingContext};
use crate::encounter::Encounter;
use crate::error::CombatError;
use crate::status::StatusEffect;
use crate::vitals::DamageType;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An effect a node applies to its current target.
pub trait NodeEffect: Send + Sync {
    /// Apply the effect to `ctx.target()`.
    fn apply(&self, ctx: &ActionContext, encounter: &mut Encounter) -> Result<(), CombatError>;

    /// Expected result of applying the effect, without applying it.
    fn approximate(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<ActionApproximation, CombatError>;
}

/// Extra damage from a source stat: `round(stat * multiplier)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatScaling {
    pub category: StatCategory,
    pub multiplier: f64,
}

/// Deal damage of one type to the target.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{DamageType, DealDamage, StatCategory};
///
/// let smite = DealDamage::new(4, DamageType::Magical)
///     .scaled_by(StatCategory::from_str("WIS"), 0.5);
/// assert_eq!(smite.scaling.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealDamage {
    pub amount: i32,
    pub damage_type: DamageType,
    #[serde(default)]
    pub scaling: Vec<StatScaling>,
}

impl DealDamage {
    pub fn new(amount: i32, damage_type: DamageType) -> Self {
        Self {
            amount,
            damage_type,
            scaling: Vec::new(),
        }
    }

    pub fn scaled_by(mut self, category: StatCategory, multiplier: f64) -> Self {
        self.scaling.push(StatScaling {
            category,
            multiplier,
        });
        self
    }

    /// Damage before the receiver's resistances.
    ///
    /// A scaling stat the source lacks contributes nothing.
    pub fn raw_damage(&self, ctx: &ActionContext, encounter: &Encounter) -> Result<i32, CombatError> {
        let source = encounter.character(ctx.source())?;
        let mut damage = self.amount;
        for scaling in &self.scaling {
            match source.stat_value(&scaling.category) {
                Ok(value) => {
                    let stat = value.to_f64().unwrap_or(0.0);
                    damage = damage.saturating_add((stat * scaling.multiplier).round() as i32);
                }
                Err(err) => {
                    warn!(source = %ctx.source(), stat = %scaling.category, error = %err, "scaling stat skipped");
                }
            }
        }
        Ok(damage)
    }

    fn context(&self, ctx: &ActionContext, encounter: &Encounter) -> Result<DamageContext, CombatError> {
        Ok(
            DamageContext::new(ctx.source().clone(), ctx.target().entity.clone())
                .with(self.damage_type, self.raw_damage(ctx, encounter)?),
        )
    }
}

impl NodeEffect for DealDamage {
    fn apply(&self, ctx: &ActionContext, encounter: &mut Encounter) -> Result<(), CombatError> {
        let damage = self.context(ctx, encounter)?;
        receive_damage(encounter, &damage)?;
        Ok(())
    }

    fn approximate(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        let target = &ctx.target().entity;
        let receiver = encounter.character(target)?;
        let modified = modify_damage(receiver, &self.context(ctx, encounter)?)?;
        let total = modified.total();

        let mut approx = ActionApproximation::new();
        // A downed receiver has nothing left to lose.
        if total > 0 && receiver.is_alive() {
            approx.add_damage(target, total);
            if total >= receiver.vitals()?.current_health() {
                approx.add_kill_chance(target, 1.0);
            }
        }
        Ok(approx)
    }
}

/// Restore health to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heal {
    pub amount: i32,
}

impl Heal {
    pub fn new(amount: i32) -> Self {
        Self { amount }
    }

    fn context(&self, ctx: &ActionContext) -> HealingContext {
        HealingContext::new(
            ctx.source().clone(),
            ctx.target().entity.clone(),
            self.amount,
        )
    }
}

impl NodeEffect for Heal {
    fn apply(&self, ctx: &ActionContext, encounter: &mut Encounter) -> Result<(), CombatError> {
        receive_healing(encounter, &self.context(ctx))?;
        Ok(())
    }

    fn approximate(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        let target = &ctx.target().entity;
        let capped = modify_healing(encounter.character(target)?, &self.context(ctx))?;
        let mut approx = ActionApproximation::new();
        if capped.amount > 0 {
            approx.add_healing(target, capped.amount);
        }
        Ok(approx)
    }
}

/// Put a status effect on the target.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyEffect(pub StatusEffect);

impl NodeEffect for ApplyEffect {
    fn apply(&self, ctx: &ActionContext, encounter: &mut Encounter) -> Result<(), CombatError> {
        encounter
            .character_mut(&ctx.target().entity)?
            .apply_effect(&self.0)?;
        debug!(effect = %self.0.id, source = %ctx.source(), target = %ctx.target().entity, "effect applied");
        Ok(())
    }

    fn approximate(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        let target = &ctx.target().entity;
        let receiver = encounter.character(target)?;
        receiver.stats()?;
        let mut approx = ActionApproximation::new();
        // Re-applying only replaces the active instance.
        if !receiver.has_effect(&self.0.id) {
            approx.add_effect(target, &self.0.id, 1.0);
        }
        Ok(approx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::config::EncounterConfig;
    use crate::entity::{EntityId, Target};
    use crate::modifier::Modifier;
    use crate::registry::StatsRegistry;
    use crate::stat::Stat;
    use crate::vitals::{Resistances, Vitals};

    fn id(s: &str) -> EntityId {
        EntityId::from_str(s)
    }

    fn encounter() -> Encounter {
        let mut enc = Encounter::new(EncounterConfig::default().with_seed(5));
        let stats: StatsRegistry = [
            Stat::new(StatCategory::from_str("STR"), 7),
            Stat::new(StatCategory::armor_class(), 12),
        ]
        .into_iter()
        .collect();
        enc.add_character(
            Character::new("cleric", "Cleric")
                .with_stats(stats)
                .with_vitals(Vitals::with_health(20).unwrap())
                .with_resistances(Resistances::new()),
        )
        .unwrap();
        enc.add_character(
            Character::new("zombie", "Zombie")
                .with_stats(StatsRegistry::new())
                .with_vitals(Vitals::with_health(12).unwrap())
                .with_resistances(Resistances::new().with(DamageType::Physical, 2)),
        )
        .unwrap();
        enc.add_character(Character::new("door", "Door")).unwrap();
        enc
    }

    fn at(target: &str) -> ActionContext {
        ActionContext::new("cleric", Target::entity(target), "test")
    }

    #[test]
    fn test_scaling_rounds_and_skips_missing_stats() {
        let enc = encounter();
        let hit = DealDamage::new(3, DamageType::Physical)
            .scaled_by(StatCategory::from_str("STR"), 0.5)
            .scaled_by(StatCategory::from_str("INT"), 10.0);
        // 3 + round(3.5) = 7
        assert_eq!(hit.raw_damage(&at("zombie"), &enc).unwrap(), 7);
    }

    #[test]
    fn test_damage_approximation_uses_modified_damage() {
        let enc = encounter();
        let hit = DealDamage::new(9, DamageType::Physical);
        let approx = hit.approximate(&at("zombie"), &enc).unwrap();
        assert_eq!(approx.damage_to(&id("zombie")), 7);
        assert_eq!(approx.kill_chance_of(&id("zombie")), 0.0);

        let big = DealDamage::new(14, DamageType::Physical);
        let approx = big.approximate(&at("zombie"), &enc).unwrap();
        assert_eq!(approx.kill_chance_of(&id("zombie")), 1.0);
    }

    #[test]
    fn test_damage_to_downed_receiver_projects_nothing() {
        let mut enc = encounter();
        let big = DealDamage::new(14, DamageType::Physical);
        big.apply(&at("zombie"), &mut enc).unwrap();
        assert!(big.approximate(&at("zombie"), &enc).unwrap().is_empty());
    }

    #[test]
    fn test_damage_applies() {
        let mut enc = encounter();
        DealDamage::new(9, DamageType::Physical)
            .apply(&at("zombie"), &mut enc)
            .unwrap();
        let zombie = enc.character(&id("zombie")).unwrap();
        assert_eq!(zombie.vitals().unwrap().current_health(), 5);
    }

    #[test]
    fn test_damage_against_non_receiver_is_recoverable() {
        let enc = encounter();
        let err = DealDamage::new(9, DamageType::True)
            .approximate(&at("door"), &enc)
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_heal_approximation_is_capped() {
        let mut enc = encounter();
        DealDamage::new(6, DamageType::True)
            .apply(&at("cleric"), &mut enc)
            .unwrap();
        let approx = Heal::new(10).approximate(&at("cleric"), &enc).unwrap();
        assert_eq!(approx.healing_to(&id("cleric")), 6);
    }

    #[test]
    fn test_apply_effect() {
        let mut enc = encounter();
        let ward = StatusEffect::new("ward").with_modifier(
            StatCategory::armor_class(),
            Modifier::flat(2, "").kind,
        );
        let effect = ApplyEffect(ward);
        let approx = effect.approximate(&at("cleric"), &enc).unwrap();
        assert_eq!(approx.effect_chance(&id("cleric"), "ward"), 1.0);

        effect.apply(&at("cleric"), &mut enc).unwrap();
        let cleric = enc.character(&id("cleric")).unwrap();
        assert!(cleric.has_effect("ward"));
        assert!(effect.approximate(&at("cleric"), &enc).unwrap().is_empty());
        assert!(effect.approximate(&at("door"), &enc).unwrap_err().is_recoverable());
    }
}
