//! Damage and healing pipeline.
//!
//! `modify_*` functions are pure: they compute what a receiver would take.
//! `receive_*` functions apply the modified amount to the encounter,
//! publishing events before the receiver's health changes.

use crate::character::Character;
use crate::encounter::Encounter;
use crate::entity::EntityId;
use crate::error::CombatError;
use crate::events::{CharacterDowned, DamageDealt, DamageTaken, Healed, HealingDone};
use crate::vitals::DamageType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

/// Damage on its way from a source to a target, split by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageContext {
    pub source: EntityId,
    pub target: EntityId,
    pub by_type: BTreeMap<DamageType, i32>,
}

impl DamageContext {
    pub fn new(source: EntityId, target: EntityId) -> Self {
        Self {
            source,
            target,
            by_type: BTreeMap::new(),
        }
    }

    /// Add `amount` of `damage_type`.
    pub fn with(mut self, damage_type: DamageType, amount: i32) -> Self {
        let slot = self.by_type.entry(damage_type).or_insert(0);
        *slot = slot.saturating_add(amount);
        self
    }

    pub fn total(&self) -> i32 {
        self.by_type
            .values()
            .fold(0i32, |acc, v| acc.saturating_add(*v))
    }
}

/// Healing on its way from a source to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingContext {
    pub source: EntityId,
    pub target: EntityId,
    pub amount: i32,
}

impl HealingContext {
    pub fn new(source: EntityId, target: EntityId, amount: i32) -> Self {
        Self {
            source,
            target,
            amount,
        }
    }
}

/// Subtract the receiver's resistance from each damage type, flooring each
/// at zero.
///
/// # Examples
///
/// ```rust
/// use zzcombat::damage::{modify_damage, DamageContext};
/// use zzcombat::{Character, DamageType, EntityId, Resistances, Vitals};
///
/// let knight = Character::new("knight", "Knight")
///     .with_vitals(Vitals::with_health(30).unwrap())
///     .with_resistances(Resistances::new().with(DamageType::Physical, 3));
///
/// let hit = DamageContext::new(EntityId::from_str("orc"), EntityId::from_str("knight"))
///     .with(DamageType::Physical, 10)
///     .with(DamageType::Magical, 2);
/// assert_eq!(modify_damage(&knight, &hit).unwrap().total(), 9);
///
/// let scratch = DamageContext::new(EntityId::from_str("orc"), EntityId::from_str("knight"))
///     .with(DamageType::Physical, 1);
/// assert_eq!(modify_damage(&knight, &scratch).unwrap().total(), 0);
/// ```
pub fn modify_damage(
    receiver: &Character,
    ctx: &DamageContext,
) -> Result<DamageContext, CombatError> {
    receiver.require_damage_receiver()?;
    let resistances = receiver.resistances()?;
    let by_type = ctx
        .by_type
        .iter()
        .map(|(damage_type, amount)| {
            let reduced = amount.saturating_sub(resistances.resistance(*damage_type));
            (*damage_type, reduced.max(0))
        })
        .collect();
    Ok(DamageContext {
        source: ctx.source.clone(),
        target: ctx.target.clone(),
        by_type,
    })
}

/// Apply damage to its target. Returns the amount dealt.
///
/// Nothing happens when the modified total is not positive. Otherwise
/// `DamageTaken` goes to the target and `DamageDealt` to the source, then the
/// target loses health. `CharacterDowned` follows if this took the target to
/// zero.
pub fn receive_damage(encounter: &mut Encounter, ctx: &DamageContext) -> Result<i32, CombatError> {
    let modified = modify_damage(encounter.character(&ctx.target)?, ctx)?;
    let total = modified.total();
    if total <= 0 {
        debug!(source = %ctx.source, target = %ctx.target, "damage fully resisted");
        return Ok(0);
    }

    let bus = Rc::clone(encounter.bus());
    bus.publish(
        &modified.target,
        &DamageTaken {
            target: modified.target.clone(),
            source: modified.source.clone(),
            amount: total,
            by_type: modified.by_type.clone(),
        },
    );
    bus.publish(
        &modified.source,
        &DamageDealt {
            source: modified.source.clone(),
            target: modified.target.clone(),
            amount: total,
        },
    );

    let receiver = encounter.character_mut(&modified.target)?;
    let was_down = !receiver.is_alive();
    receiver.vitals_mut()?.take_damage(total)?;
    let downed = !was_down && !receiver.is_alive();
    debug!(
        source = %modified.source,
        target = %modified.target,
        amount = total,
        remaining = receiver.vitals()?.current_health(),
        "damage received"
    );

    if downed {
        bus.publish(
            &modified.target,
            &CharacterDowned {
                entity: modified.target.clone(),
                by: modified.source.clone(),
            },
        );
    }
    Ok(total)
}

/// Cap healing so the receiver does not exceed its maximum health.
pub fn modify_healing(
    receiver: &Character,
    ctx: &HealingContext,
) -> Result<HealingContext, CombatError> {
    receiver.require_damage_receiver()?;
    let vitals = receiver.vitals()?;
    let headroom = (vitals.max_health() - vitals.current_health()).max(0);
    Ok(HealingContext {
        source: ctx.source.clone(),
        target: ctx.target.clone(),
        amount: ctx.amount.clamp(0, headroom),
    })
}

/// Apply healing to its target. Returns the amount healed.
///
/// Mirrors [`receive_damage`]: nothing happens for a non-positive amount,
/// otherwise `Healed` and `HealingDone` are published before health changes.
pub fn receive_healing(
    encounter: &mut Encounter,
    ctx: &HealingContext,
) -> Result<i32, CombatError> {
    let modified = modify_healing(encounter.character(&ctx.target)?, ctx)?;
    if modified.amount <= 0 {
        return Ok(0);
    }

    let bus = Rc::clone(encounter.bus());
    bus.publish(
        &modified.target,
        &Healed {
            target: modified.target.clone(),
            source: modified.source.clone(),
            amount: modified.amount,
        },
    );
    bus.publish(
        &modified.source,
        &HealingDone {
            source: modified.source.clone(),
            target: modified.target.clone(),
            amount: modified.amount,
        },
    );

    encounter
        .character_mut(&modified.target)?
        .vitals_mut()?
        .take_heal(modified.amount)?;
    debug!(
        source = %modified.source,
        target = %modified.target,
        amount = modified.amount,
        "healing received"
    );
    Ok(modified.amount)
}
