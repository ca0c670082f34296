//! Action node module.
//!
//! An [`ActionNode`] is the branching unit of an action tree. For each
//! target its selector yields, a node:
//!
//! 1. retargets the context,
//! 2. rolls (if it has a resolver),
//! 3. runs its own effect,
//! 4. runs the children registered under the outcome.
//!
//! A node without a resolver has the outcome [`Outcome::None`], so only its
//! default bucket runs.
//!
//! Approximation walks the same tree, but instead of one outcome it weighs
//! every bucket by that outcome's probability. A bucket whose outcome the
//! resolver cannot produce is never reached, in either mode.
//!
//! Recoverable errors (a target without vitals, an entity that left the
//! encounter) are logged and skipped. A failed roll or targeting step skips
//! the whole target; a failed effect or child skips only itself, so the
//! remaining children still run. Other errors propagate.

use crate::action::Action;
use crate::approximation::ActionApproximation;
use crate::context::ActionContext;
use crate::effects::NodeEffect;
use crate::encounter::Encounter;
use crate::entity::Target;
use crate::error::CombatError;
use crate::roll::{Outcome, OutcomeChances, RollResolver};
use crate::targeting::TargetingSelector;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A node of an action tree.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use zzcombat::{
///     Action, ActionNode, AttackRoll, Character, DamageType, DealDamage, Encounter,
///     EncounterConfig, EntityId, Resistances, Stat, StatCategory, StatsRegistry, Target, Vitals,
/// };
///
/// let mut encounter = Encounter::new(EncounterConfig::default().with_seed(9));
/// for id in ["hero", "orc"] {
///     let stats: StatsRegistry = [
///         Stat::new(StatCategory::armor_class(), 15),
///         Stat::new(StatCategory::attack_bonus(), 5),
///     ]
///     .into_iter()
///     .collect();
///     encounter
///         .add_character(
///             Character::new(id, id)
///                 .with_stats(stats)
///                 .with_vitals(Vitals::with_health(20).unwrap())
///                 .with_resistances(Resistances::new()),
///         )
///         .unwrap();
/// }
///
/// let strike = ActionNode::builder("strike")
///     .with_roll(Arc::new(AttackRoll::default()))
///     .on_success(Arc::new(
///         ActionNode::builder("hit")
///             .with_effect(Arc::new(DealDamage::new(10, DamageType::Physical)))
///             .build(),
///     ))
///     .build();
///
/// let ctx = zzcombat::ActionContext::new("hero", Target::entity("orc"), "strike");
/// let approx = strike.approximate(&ctx, &encounter).unwrap();
/// // 10 damage on a 50% success branch.
/// assert_eq!(approx.damage_to(&EntityId::from_str("orc")), 5);
/// ```
#[derive(Clone)]
pub struct ActionNode {
    label: String,
    roll: Option<Arc<dyn RollResolver>>,
    targeting: Option<Arc<dyn TargetingSelector>>,
    effect: Option<Arc<dyn NodeEffect>>,
    children: BTreeMap<Outcome, Vec<Arc<dyn Action>>>,
}

impl ActionNode {
    pub fn builder(label: impl Into<String>) -> ActionNodeBuilder {
        ActionNodeBuilder {
            node: ActionNode {
                label: label.into(),
                roll: None,
                targeting: None,
                effect: None,
                children: BTreeMap::new(),
            },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn has_roll(&self) -> bool {
        self.roll.is_some()
    }

    /// Children registered under `outcome`, in registration order.
    pub fn children_for(&self, outcome: Outcome) -> &[Arc<dyn Action>] {
        self.children.get(&outcome).map_or(&[], Vec::as_slice)
    }

    fn targets(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<Vec<Target>, CombatError> {
        match &self.targeting {
            Some(selector) => selector.select(ctx, encounter),
            None => Ok(vec![ctx.target().clone()]),
        }
    }

    fn execute_on(&self, ctx: &ActionContext, encounter: &mut Encounter) -> Result<(), CombatError> {
        let outcome = match &self.roll {
            Some(resolver) => resolver.resolve_roll(ctx, encounter)?.result,
            None => Outcome::None,
        };
        if let Some(effect) = &self.effect {
            self.recover(ctx, "effect", effect.apply(ctx, encounter))?;
        }
        for child in self.children_for(outcome) {
            self.recover(ctx, "child", child.execute(ctx, encounter))?;
        }
        Ok(())
    }

    fn approximate_on(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        let mut approx = match &self.effect {
            Some(effect) => self
                .recover(ctx, "effect", effect.approximate(ctx, encounter))?
                .unwrap_or_default(),
            None => ActionApproximation::new(),
        };
        let chances = match &self.roll {
            Some(resolver) => resolver.success_chance(resolver.check(ctx, encounter)?),
            None => OutcomeChances::certain(Outcome::None),
        };
        for (outcome, children) in &self.children {
            let chance = chances.get(*outcome);
            if chance <= 0.0 {
                continue;
            }
            for child in children {
                if let Some(child_approx) =
                    self.recover(ctx, "child", child.approximate(ctx, encounter))?
                {
                    approx.merge_scaled(&child_approx, chance);
                }
            }
        }
        Ok(approx)
    }

    /// Turns a recoverable error from one effect or child into a warning so
    /// the rest of the node still runs for this target.
    fn recover<T>(
        &self,
        ctx: &ActionContext,
        stage: &str,
        result: Result<T, CombatError>,
    ) -> Result<Option<T>, CombatError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_recoverable() => {
                warn!(
                    node = %self.label,
                    target = %ctx.target().entity,
                    stage,
                    error = %err,
                    "skipping"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn absorb(&self, target: &Target, result: Result<(), CombatError>) -> Result<(), CombatError> {
        match result {
            Err(err) if err.is_recoverable() => {
                warn!(node = %self.label, target = %target.entity, error = %err, "skipping target");
                Ok(())
            }
            other => other,
        }
    }
}

impl Action for ActionNode {
    fn execute(&self, ctx: &ActionContext, encounter: &mut Encounter) -> Result<(), CombatError> {
        let targets = match self.targets(ctx, encounter) {
            Ok(targets) => targets,
            Err(err) if err.is_recoverable() => {
                warn!(node = %self.label, error = %err, "targeting failed");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        debug!(node = %self.label, targets = targets.len(), "executing node");
        for target in targets {
            let retargeted = ctx.with_target(target.clone());
            let result = self.execute_on(&retargeted, encounter);
            self.absorb(&target, result)?;
        }
        Ok(())
    }

    fn approximate(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        let mut total = ActionApproximation::new();
        let targets = match self.targets(ctx, encounter) {
            Ok(targets) => targets,
            Err(err) if err.is_recoverable() => {
                warn!(node = %self.label, error = %err, "targeting failed");
                return Ok(total);
            }
            Err(err) => return Err(err),
        };
        for target in targets {
            let retargeted = ctx.with_target(target.clone());
            let result = self
                .approximate_on(&retargeted, encounter)
                .map(|approx| total.merge(&approx));
            self.absorb(&target, result)?;
        }
        Ok(total)
    }
}

impl fmt::Debug for ActionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buckets: BTreeMap<&Outcome, usize> =
            self.children.iter().map(|(o, c)| (o, c.len())).collect();
        f.debug_struct("ActionNode")
            .field("label", &self.label)
            .field("roll", &self.roll.is_some())
            .field("targeting", &self.targeting.is_some())
            .field("effect", &self.effect.is_some())
            .field("children", &buckets)
            .finish()
    }
}

/// Builder for [`ActionNode`].
pub struct ActionNodeBuilder {
    node: ActionNode,
}

impl ActionNodeBuilder {
    pub fn with_roll(mut self, resolver: Arc<dyn RollResolver>) -> Self {
        self.node.roll = Some(resolver);
        self
    }

    pub fn with_targeting(mut self, selector: Arc<dyn TargetingSelector>) -> Self {
        self.node.targeting = Some(selector);
        self
    }

    pub fn with_effect(mut self, effect: Arc<dyn NodeEffect>) -> Self {
        self.node.effect = Some(effect);
        self
    }

    /// Register a child under `outcome`, after any already there.
    pub fn on_result(mut self, outcome: Outcome, child: Arc<dyn Action>) -> Self {
        self.node.children.entry(outcome).or_default().push(child);
        self
    }

    pub fn on_success(self, child: Arc<dyn Action>) -> Self {
        self.on_result(Outcome::Success, child)
    }

    pub fn on_failure(self, child: Arc<dyn Action>) -> Self {
        self.on_result(Outcome::Failure, child)
    }

    pub fn on_critical_success(self, child: Arc<dyn Action>) -> Self {
        self.on_result(Outcome::CriticalSuccess, child)
    }

    pub fn on_critical_failure(self, child: Arc<dyn Action>) -> Self {
        self.on_result(Outcome::CriticalFailure, child)
    }

    /// Register a child for the no-roll bucket.
    pub fn always(self, child: Arc<dyn Action>) -> Self {
        self.on_result(Outcome::None, child)
    }

    pub fn build(self) -> ActionNode {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::config::EncounterConfig;
    use crate::registry::StatsRegistry;
    use crate::roll::{AttackRoll, RollCheck, RollRecord, SavingThrow};
    use crate::targeting::FixedTargets;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Forced(Outcome);

    impl RollResolver for Forced {
        fn check(&self, _: &ActionContext, _: &Encounter) -> Result<RollCheck, CombatError> {
            Ok(RollCheck::new(10, 0))
        }

        fn resolve_roll(
            &self,
            ctx: &ActionContext,
            encounter: &mut Encounter,
        ) -> Result<RollRecord, CombatError> {
            let roll = match self.0 {
                Outcome::CriticalFailure => 1,
                Outcome::Failure => 5,
                Outcome::Success => 15,
                _ => 20,
            };
            Ok(self.check(ctx, encounter)?.record(roll))
        }

        fn success_chance(&self, _: RollCheck) -> OutcomeChances {
            OutcomeChances::certain(self.0)
        }
    }

    #[derive(Default)]
    struct Recorder {
        runs: AtomicUsize,
        targets: Mutex<Vec<String>>,
    }

    impl Action for Recorder {
        fn execute(&self, ctx: &ActionContext, _: &mut Encounter) -> Result<(), CombatError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut t) = self.targets.lock() {
                t.push(ctx.target().entity.to_string());
            }
            Ok(())
        }

        fn approximate(
            &self,
            ctx: &ActionContext,
            _: &Encounter,
        ) -> Result<ActionApproximation, CombatError> {
            let mut a = ActionApproximation::new();
            a.add_damage(&ctx.target().entity, 10);
            a.add_kill_chance(&ctx.target().entity, 1.0);
            Ok(a)
        }
    }

    struct Unreachable;

    impl Action for Unreachable {
        fn execute(&self, ctx: &ActionContext, _: &mut Encounter) -> Result<(), CombatError> {
            Err(CombatError::UnknownEntity(ctx.target().entity.clone()))
        }

        fn approximate(
            &self,
            ctx: &ActionContext,
            _: &Encounter,
        ) -> Result<ActionApproximation, CombatError> {
            Err(CombatError::UnknownEntity(ctx.target().entity.clone()))
        }
    }

    fn ctx() -> ActionContext {
        ActionContext::new("a", Target::entity("b"), "test")
    }

    fn encounter() -> Encounter {
        Encounter::new(EncounterConfig::default().with_seed(1))
    }

    #[test]
    fn test_child_runs_only_on_matching_outcome() {
        let child = Arc::new(Recorder::default());
        let node = ActionNode::builder("n")
            .with_roll(Arc::new(Forced(Outcome::Failure)))
            .on_success(child.clone())
            .build();
        node.execute(&ctx(), &mut encounter()).unwrap();
        assert_eq!(child.runs.load(Ordering::SeqCst), 0);

        let child = Arc::new(Recorder::default());
        let node = ActionNode::builder("n")
            .with_roll(Arc::new(Forced(Outcome::Success)))
            .on_success(child.clone())
            .build();
        node.execute(&ctx(), &mut encounter()).unwrap();
        assert_eq!(child.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_without_roll_only_default_bucket_runs() {
        let default_child = Arc::new(Recorder::default());
        let success_child = Arc::new(Recorder::default());
        let node = ActionNode::builder("n")
            .always(default_child.clone())
            .on_success(success_child.clone())
            .build();
        node.execute(&ctx(), &mut encounter()).unwrap();
        assert_eq!(default_child.runs.load(Ordering::SeqCst), 1);
        assert_eq!(success_child.runs.load(Ordering::SeqCst), 0);

        let approx = node.approximate(&ctx(), &encounter()).unwrap();
        assert_eq!(approx.damage_to(&"b".into()), 10);
    }

    #[test]
    fn test_targets_processed_in_selector_order() {
        let child = Arc::new(Recorder::default());
        let node = ActionNode::builder("n")
            .with_targeting(Arc::new(FixedTargets(vec![
                Target::entity("z"),
                Target::entity("m"),
                Target::entity("a"),
            ])))
            .always(child.clone())
            .build();
        node.execute(&ctx(), &mut encounter()).unwrap();
        assert_eq!(*child.targets.lock().unwrap(), ["z", "m", "a"]);
    }

    #[test]
    fn test_empty_targeting_contributes_nothing() {
        let child = Arc::new(Recorder::default());
        let node = ActionNode::builder("n")
            .with_targeting(Arc::new(FixedTargets(Vec::new())))
            .always(child.clone())
            .build();
        node.execute(&ctx(), &mut encounter()).unwrap();
        assert_eq!(child.runs.load(Ordering::SeqCst), 0);
        assert!(node.approximate(&ctx(), &encounter()).unwrap().is_empty());
    }

    #[test]
    fn test_approximation_weighs_buckets() {
        let node = ActionNode::builder("n")
            .with_roll(Arc::new(SavingThrow::new(12)))
            .on_failure(Arc::new(Recorder::default()))
            .on_critical_failure(Arc::new(Recorder::default()))
            .build();
        // DC 12, no bonus: failure 10/20, critical failure 1/20.
        let approx = node.approximate(&ctx(), &encounter()).unwrap();
        assert_eq!(approx.damage_to(&"b".into()), 5);
        assert!((approx.kill_chance_of(&"b".into()) - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_recoverable_errors_skip_target() {
        let after = Arc::new(Recorder::default());
        let node = ActionNode::builder("n")
            .with_targeting(Arc::new(FixedTargets(vec![
                Target::entity("x"),
                Target::entity("y"),
            ])))
            .always(Arc::new(Unreachable))
            .build();
        let root = ActionNode::builder("root")
            .always(Arc::new(node))
            .always(after.clone())
            .build();
        root.execute(&ctx(), &mut encounter()).unwrap();
        assert_eq!(after.runs.load(Ordering::SeqCst), 1);
        assert!(root.approximate(&ctx(), &encounter()).is_ok());
    }

    #[test]
    fn test_configuration_errors_propagate() {
        let node = ActionNode::builder("n")
            .with_roll(Arc::new(AttackRoll::default()))
            .build();
        let mut enc = encounter();
        enc.add_character(Character::new("a", "A")).unwrap();
        enc.add_character(Character::new("b", "B").with_stats(StatsRegistry::new()))
            .unwrap();
        // The target has a registry but no armor class.
        let err = node.execute(&ctx(), &mut enc).unwrap_err();
        assert!(matches!(err, CombatError::MissingStat(_)));
    }
}
