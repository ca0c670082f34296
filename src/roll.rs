//! Roll resolution module.
//!
//! A roll is a d20 draw against a target number adjusted by a bonus. The
//! classification rule is fixed:
//!
//! - a natural 1 is a critical failure;
//! - a natural 20 is a critical success;
//! - otherwise the roll succeeds iff `roll >= target_number - roll_bonus`.
//!
//! [`OutcomeChances::d20`] gives the matching probability of each outcome.
//! Rolls 2 to 19 are the only ones the target number can move, so the model
//! counts how many of those 18 faces fail, clamped to `0..=18`. The four
//! masses therefore always lie in `[0, 1]` and sum to one, whatever the
//! target number and bonus.

use crate::category::StatCategory;
use crate::context::ActionContext;
use crate::encounter::Encounter;
use crate::entity::EntityId;
use crate::error::CombatError;
use crate::numeric::ValueKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Result class of a roll.
///
/// `None` is the outcome of a node that does not roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    CriticalFailure,
    Failure,
    Success,
    CriticalSuccess,
    None,
}

impl Outcome {
    /// The four outcomes a d20 roll can produce.
    pub const ROLLED: [Outcome; 4] = [
        Outcome::CriticalFailure,
        Outcome::Failure,
        Outcome::Success,
        Outcome::CriticalSuccess,
    ];

    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success | Outcome::CriticalSuccess)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::CriticalFailure => "critical failure",
            Outcome::Failure => "failure",
            Outcome::Success => "success",
            Outcome::CriticalSuccess => "critical success",
            Outcome::None => "none",
        };
        f.write_str(name)
    }
}

/// What a roll is made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollCheck {
    pub target_number: i32,
    pub roll_bonus: i32,
}

impl RollCheck {
    pub fn new(target_number: i32, roll_bonus: i32) -> Self {
        Self {
            target_number,
            roll_bonus,
        }
    }

    /// Classify a natural roll against this check.
    pub fn record(self, roll: i32) -> RollRecord {
        RollRecord::new(roll, self.target_number, self.roll_bonus)
    }
}

/// A resolved roll.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Outcome, RollRecord};
///
/// assert_eq!(RollRecord::new(1, 10, 0).result, Outcome::CriticalFailure);
/// assert_eq!(RollRecord::new(20, 10, 0).result, Outcome::CriticalSuccess);
/// assert_eq!(RollRecord::new(15, 10, 0).result, Outcome::Success);
/// assert_eq!(RollRecord::new(5, 10, 0).result, Outcome::Failure);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRecord {
    pub roll: i32,
    pub target_number: i32,
    pub roll_bonus: i32,
    pub result: Outcome,
}

impl RollRecord {
    pub fn new(roll: i32, target_number: i32, roll_bonus: i32) -> Self {
        let needed = target_number.saturating_sub(roll_bonus);
        let result = match roll {
            1 => Outcome::CriticalFailure,
            20 => Outcome::CriticalSuccess,
            r if r >= needed => Outcome::Success,
            _ => Outcome::Failure,
        };
        Self {
            roll,
            target_number,
            roll_bonus,
            result,
        }
    }

    pub fn check(&self) -> RollCheck {
        RollCheck::new(self.target_number, self.roll_bonus)
    }

    /// One readable line describing the roll.
    ///
    /// ```rust
    /// use zzcombat::RollRecord;
    ///
    /// assert_eq!(RollRecord::new(12, 15, 5).log(), "rolled 12 + 5 vs 15: success");
    /// ```
    pub fn log(&self) -> String {
        format!(
            "rolled {} {} {} vs {}: {}",
            self.roll,
            if self.roll_bonus < 0 { '-' } else { '+' },
            self.roll_bonus.unsigned_abs(),
            self.target_number,
            self.result
        )
    }
}

/// Probability of each outcome.
///
/// Outcomes absent from the map have probability zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeChances(BTreeMap<Outcome, f64>);

impl OutcomeChances {
    /// The default d20 model for a check.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzcombat::{Outcome, OutcomeChances, RollCheck};
    ///
    /// let chances = OutcomeChances::d20(RollCheck::new(15, 5));
    /// assert!((chances.get(Outcome::CriticalSuccess) - 0.05).abs() < 1e-9);
    /// assert!((chances.get(Outcome::Success) - 0.5).abs() < 1e-9);
    /// assert!((chances.get(Outcome::Failure) - 0.4).abs() < 1e-9);
    /// assert!((chances.get(Outcome::CriticalFailure) - 0.05).abs() < 1e-9);
    /// ```
    pub fn d20(check: RollCheck) -> Self {
        const CRIT: f64 = 0.05;
        let needed = check.target_number as i64 - check.roll_bonus as i64;
        let failing_faces = (needed - 2).clamp(0, 18);
        let succeeding_faces = 18 - failing_faces;

        let mut map = BTreeMap::new();
        map.insert(Outcome::CriticalFailure, CRIT);
        map.insert(Outcome::Failure, failing_faces as f64 / 20.0);
        map.insert(Outcome::Success, succeeding_faces as f64 / 20.0);
        map.insert(Outcome::CriticalSuccess, CRIT);
        Self(map)
    }

    /// A distribution with all mass on one outcome.
    pub fn certain(outcome: Outcome) -> Self {
        Self(BTreeMap::from([(outcome, 1.0)]))
    }

    /// Build from explicit masses, each clamped to `[0, 1]`.
    pub fn from_masses(masses: impl IntoIterator<Item = (Outcome, f64)>) -> Self {
        Self(
            masses
                .into_iter()
                .map(|(o, p)| (o, p.clamp(0.0, 1.0)))
                .collect(),
        )
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        self.0.get(&outcome).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Outcome, f64)> + '_ {
        self.0.iter().map(|(o, p)| (*o, *p))
    }
}

/// Source of randomness for an encounter.
#[derive(Debug, Clone)]
pub struct Dice {
    rng: StdRng,
}

impl Dice {
    /// Replayable dice.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Dice seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Uniform draw in `[1, sides]`. Zero-sided dice roll 0.
    pub fn roll(&mut self, sides: u32) -> i32 {
        if sides == 0 {
            return 0;
        }
        self.rng.random_range(1..=sides) as i32
    }

    pub fn d20(&mut self) -> i32 {
        self.roll(20)
    }
}

/// Derives a roll from an action context and resolves it.
///
/// Implementations only decide the [`RollCheck`]. Drawing and the
/// probability model have defaults.
pub trait RollResolver: Send + Sync {
    /// Target number and bonus for this context.
    fn check(&self, ctx: &ActionContext, encounter: &Encounter) -> Result<RollCheck, CombatError>;

    /// Draw a d20 from the encounter's dice and classify it.
    fn resolve_roll(
        &self,
        ctx: &ActionContext,
        encounter: &mut Encounter,
    ) -> Result<RollRecord, CombatError> {
        let check = self.check(ctx, encounter)?;
        let record = check.record(encounter.dice_mut().d20());
        debug!(
            source = %ctx.source(),
            target = %ctx.target().entity,
            roll = record.roll,
            outcome = %record.result,
            "{}",
            record.log()
        );
        Ok(record)
    }

    /// Probability of each outcome for a check.
    fn success_chance(&self, check: RollCheck) -> OutcomeChances {
        OutcomeChances::d20(check)
    }
}

fn stat_as_i32(
    encounter: &Encounter,
    entity: &EntityId,
    category: &StatCategory,
) -> Result<i32, CombatError> {
    let value = encounter.character(entity)?.stat_value(category)?;
    value.to_i32().ok_or(CombatError::ValueKindMismatch {
        expected: ValueKind::Int,
        found: value.kind(),
    })
}

/// Source attacks target: target number is the target's armor class and
/// the bonus is the source's attack bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRoll {
    pub defense_stat: StatCategory,
    pub bonus_stat: StatCategory,
}

impl Default for AttackRoll {
    fn default() -> Self {
        Self {
            defense_stat: StatCategory::armor_class(),
            bonus_stat: StatCategory::attack_bonus(),
        }
    }
}

impl RollResolver for AttackRoll {
    fn check(&self, ctx: &ActionContext, encounter: &Encounter) -> Result<RollCheck, CombatError> {
        Ok(RollCheck::new(
            stat_as_i32(encounter, &ctx.target().entity, &self.defense_stat)?,
            stat_as_i32(encounter, ctx.source(), &self.bonus_stat)?,
        ))
    }
}

/// The target rolls against a fixed difficulty class, adding its save stat
/// if one is configured. Success means the target resisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingThrow {
    pub difficulty_class: i32,
    #[serde(default)]
    pub save_stat: Option<StatCategory>,
}

impl SavingThrow {
    pub fn new(difficulty_class: i32) -> Self {
        Self {
            difficulty_class,
            save_stat: None,
        }
    }

    pub fn with_save_stat(mut self, category: StatCategory) -> Self {
        self.save_stat = Some(category);
        self
    }
}

impl RollResolver for SavingThrow {
    fn check(&self, ctx: &ActionContext, encounter: &Encounter) -> Result<RollCheck, CombatError> {
        let bonus = match &self.save_stat {
            Some(category) => stat_as_i32(encounter, &ctx.target().entity, category)?,
            None => 0,
        };
        Ok(RollCheck::new(self.difficulty_class, bonus))
    }
}
