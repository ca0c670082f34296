//! Character AI.
//!
//! The AI approximates every action it owns against every target it can
//! reach, scores each projection and executes the best one. A turn repeats
//! this until nothing scores above zero, the actor goes down, or the
//! configured action limit is hit.

use crate::action::{Action, GameAction};
use crate::approximation::ActionApproximation;
use crate::character::{Capability, Character};
use crate::config::ScoringWeights;
use crate::encounter::Encounter;
use crate::entity::{EntityId, Target};
use crate::error::CombatError;
use crate::grid::SpatialQuery;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns an approximation into a single utility number for `actor`.
pub trait ActionScorer {
    fn score(&self, actor: &Character, approx: &ActionApproximation, encounter: &Encounter) -> f64;
}

/// Linear scorer over [`ScoringWeights`].
///
/// Damage and kills count for the actor against enemies and against it on
/// allies; healing the other way round. Status effects always count
/// positively. Entities that are not characters are ignored.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{
///     ActionApproximation, ActionScorer, Character, Encounter, EncounterConfig, EntityId,
///     ScoringWeights, WeightedScorer,
/// };
///
/// let mut encounter = Encounter::new(EncounterConfig::default());
/// encounter.add_character(Character::new("hero", "Hero").with_team("blue")).unwrap();
/// encounter.add_character(Character::new("orc", "Orc").with_team("red")).unwrap();
///
/// let mut approx = ActionApproximation::new();
/// approx.add_damage(&EntityId::from_str("orc"), 6);
/// approx.add_damage(&EntityId::from_str("hero"), 2);
///
/// let hero = encounter.character(&EntityId::from_str("hero")).unwrap();
/// let scorer = WeightedScorer(ScoringWeights::default());
/// assert_eq!(scorer.score(hero, &approx, &encounter), 4.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedScorer(pub ScoringWeights);

impl WeightedScorer {
    /// +1 for enemies, -1 for allies, `None` for non-characters.
    fn stance(actor: &Character, entity: &EntityId, encounter: &Encounter) -> Option<f64> {
        let other = encounter.find_character(entity)?;
        Some(if actor.is_ally_of(other) { -1.0 } else { 1.0 })
    }
}

impl ActionScorer for WeightedScorer {
    fn score(&self, actor: &Character, approx: &ActionApproximation, encounter: &Encounter) -> f64 {
        let weights = &self.0;
        let mut score = 0.0;
        for (entity, amount) in &approx.damage_dealt {
            if let Some(sign) = Self::stance(actor, entity, encounter) {
                score += sign * weights.damage * f64::from(*amount);
            }
        }
        for (entity, amount) in &approx.healing_done {
            if let Some(sign) = Self::stance(actor, entity, encounter) {
                score -= sign * weights.healing * f64::from(*amount);
            }
        }
        for (entity, chance) in &approx.kill_chance {
            if let Some(sign) = Self::stance(actor, entity, encounter) {
                score += sign * weights.kill * chance;
            }
        }
        for effects in approx.effects_applied.values() {
            score += weights.effect * effects.values().sum::<f64>();
        }
        score
    }
}

/// One scored candidate.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub score: f64,
    pub action: Arc<GameAction>,
    pub target: Target,
}

/// Greedy AI: pick the highest-scoring action and target.
pub struct CharacterAi {
    scorer: Box<dyn ActionScorer>,
    spatial: Arc<dyn SpatialQuery>,
}

impl fmt::Debug for CharacterAi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharacterAi").finish_non_exhaustive()
    }
}

impl CharacterAi {
    pub fn new(scorer: Box<dyn ActionScorer>, spatial: Arc<dyn SpatialQuery>) -> Self {
        Self { scorer, spatial }
    }

    /// An AI scoring with the encounter's configured weights.
    pub fn weighted(encounter: &Encounter, spatial: Arc<dyn SpatialQuery>) -> Self {
        Self::new(Box::new(WeightedScorer(encounter.config().scoring)), spatial)
    }

    /// Candidate targets for `action` taken by `actor`.
    ///
    /// A positioned actor asks the spatial service what it can reach; one
    /// without a position may aim at any character.
    pub fn potential_targets(
        &self,
        actor: &Character,
        action: &GameAction,
        encounter: &Encounter,
    ) -> Vec<Target> {
        match actor.tile() {
            Some(origin) => {
                let tiles = self.spatial.potential_tiles(encounter, action, origin);
                self.spatial.entities_on_tiles(encounter, &tiles)
            }
            None => encounter.characters().map(Character::as_target).collect(),
        }
    }

    /// Score every action × target pair, best first. Equal scores keep
    /// discovery order.
    pub fn evaluate(
        &self,
        encounter: &Encounter,
        actor_id: &EntityId,
    ) -> Result<Vec<Evaluation>, CombatError> {
        let actor = encounter.character(actor_id)?;
        if !actor.has(Capability::Actions) {
            return Ok(Vec::new());
        }

        let mut evaluations = Vec::new();
        for action in actor.actions()? {
            if !action.can_execute(actor_id, encounter) {
                continue;
            }
            for target in self.potential_targets(actor, action, encounter) {
                let ctx = action.context(actor_id.clone(), target.clone());
                let approx = match action.approximate(&ctx, encounter) {
                    Ok(approx) => approx,
                    Err(err) if err.is_recoverable() => {
                        warn!(action = %action.name(), target = %target.entity, error = %err, "candidate skipped");
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                let score = self.scorer.score(actor, &approx, encounter);
                debug!(actor = %actor_id, action = %action.name(), target = %target.entity, score, "candidate scored");
                evaluations.push(Evaluation {
                    score,
                    action: Arc::clone(action),
                    target,
                });
            }
        }
        evaluations.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(evaluations)
    }

    /// Execute the best candidate if it scores above zero.
    pub fn take_action(
        &self,
        encounter: &mut Encounter,
        actor_id: &EntityId,
    ) -> Result<Option<Evaluation>, CombatError> {
        let Some(best) = self.evaluate(encounter, actor_id)?.into_iter().next() else {
            return Ok(None);
        };
        if best.score <= 0.0 {
            debug!(actor = %actor_id, score = best.score, "nothing worth doing");
            return Ok(None);
        }
        let ctx = best.action.context(actor_id.clone(), best.target.clone());
        best.action.execute(&ctx, encounter)?;
        Ok(Some(best))
    }

    /// Take actions until none is worth it, the actor is down, or
    /// `max_actions_per_turn` is reached. Returns what was done.
    pub fn take_turn(
        &self,
        encounter: &mut Encounter,
        actor_id: &EntityId,
    ) -> Result<Vec<Evaluation>, CombatError> {
        let mut taken = Vec::new();
        for _ in 0..encounter.config().max_actions_per_turn {
            let alive = encounter
                .find_character(actor_id)
                .is_some_and(Character::is_alive);
            if !alive {
                break;
            }
            match self.take_action(encounter, actor_id)? {
                Some(evaluation) => taken.push(evaluation),
                None => break,
            }
        }
        debug!(actor = %actor_id, actions = taken.len(), "turn over");
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncounterConfig;
    use crate::effects::{DealDamage, Heal};
    use crate::grid::{OccupancyGrid, Tile};
    use crate::node::ActionNode;
    use crate::vitals::{DamageType, Resistances, Vitals};

    fn id(s: &str) -> EntityId {
        EntityId::from_str(s)
    }

    fn fighter(name: &str, team: &str, x: i32, health: i32) -> Character {
        Character::new(name, name)
            .with_team(team)
            .with_tile(Tile::new(x, 0, 0))
            .with_vitals(Vitals::with_health(health).unwrap())
            .with_resistances(Resistances::new())
    }

    fn punch() -> Arc<GameAction> {
        Arc::new(
            GameAction::new("punch").with_child(Arc::new(
                ActionNode::builder("punch")
                    .with_effect(Arc::new(DealDamage::new(3, DamageType::Physical)))
                    .build(),
            )),
        )
    }

    fn mend() -> Arc<GameAction> {
        Arc::new(
            GameAction::new("mend").with_child(Arc::new(
                ActionNode::builder("mend")
                    .with_effect(Arc::new(Heal::new(5)))
                    .build(),
            )),
        )
    }

    #[test]
    fn test_healing_scores_by_stance() {
        let mut enc = Encounter::new(EncounterConfig::default());
        enc.add_character(fighter("a", "blue", 0, 10)).unwrap();
        enc.add_character(fighter("b", "red", 1, 10)).unwrap();
        let a = enc.character(&id("a")).unwrap();

        let mut approx = ActionApproximation::new();
        approx.add_healing(&id("a"), 4);
        approx.add_healing(&id("b"), 1);
        approx.add_effect(&id("nobody"), "bless", 0.5);
        let score = WeightedScorer::default().score(a, &approx, &enc);
        // +4 ally healing, -1 enemy healing, +0.5 * 2 effect
        assert_eq!(score, 4.0);
    }

    #[test]
    fn test_take_turn_stops_when_target_is_down() {
        let mut enc = Encounter::new(EncounterConfig::default());
        enc.add_character(fighter("hero", "blue", 0, 10).with_actions(vec![punch()]))
            .unwrap();
        enc.add_character(fighter("rat", "red", 1, 5)).unwrap();

        let ai = CharacterAi::weighted(&enc, Arc::new(OccupancyGrid::new()));
        let taken = ai.take_turn(&mut enc, &id("hero")).unwrap();
        // 3 damage, then the killing blow; a downed rat is no longer worth hitting.
        assert_eq!(taken.len(), 2);
        assert!(taken.iter().all(|e| e.target.entity == id("rat")));
        assert!(!enc.character(&id("rat")).unwrap().is_alive());
    }

    #[test]
    fn test_out_of_range_target_is_ignored() {
        let mut enc = Encounter::new(EncounterConfig::default());
        enc.add_character(fighter("hero", "blue", 0, 10).with_actions(vec![punch()]))
            .unwrap();
        enc.add_character(fighter("rat", "red", 4, 5)).unwrap();

        let ai = CharacterAi::weighted(&enc, Arc::new(OccupancyGrid::new()));
        assert!(ai.take_action(&mut enc, &id("hero")).unwrap().is_none());
    }

    #[test]
    fn test_prefers_healing_a_wounded_ally() {
        let mut enc = Encounter::new(EncounterConfig::default());
        enc.add_character(fighter("cleric", "blue", 0, 10).with_actions(vec![punch(), mend()]))
            .unwrap();
        let mut knight = fighter("knight", "blue", 1, 20);
        knight.vitals_mut().unwrap().take_damage(15).unwrap();
        enc.add_character(knight).unwrap();

        let ai = CharacterAi::weighted(&enc, Arc::new(OccupancyGrid::new()));
        let best = ai.take_action(&mut enc, &id("cleric")).unwrap().unwrap();
        assert_eq!(best.action.name(), "mend");
        assert_eq!(best.target.entity, id("knight"));
        assert_eq!(
            enc.character(&id("knight")).unwrap().vitals().unwrap().current_health(),
            10
        );
    }
}
