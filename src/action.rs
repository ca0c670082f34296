//! Actions.
//!
//! Everything in an action tree implements [`Action`], which has two modes:
//! `execute` mutates the encounter, `approximate` projects the expected
//! effects without touching it. [`GameAction`] is the root a character
//! owns: it carries the name, cost and range, and runs its children in
//! order.

use crate::approximation::ActionApproximation;
use crate::context::ActionContext;
use crate::encounter::Encounter;
use crate::entity::{EntityId, Target};
use crate::error::CombatError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A unit of an action tree.
///
/// Action templates are shared through `Arc` and are never mutated while
/// running.
pub trait Action: Send + Sync {
    /// Perform the action.
    fn execute(&self, ctx: &ActionContext, encounter: &mut Encounter) -> Result<(), CombatError>;

    /// Expected effects of the action, without side effects.
    fn approximate(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<ActionApproximation, CombatError>;
}

/// A named action a character can take.
///
/// # Examples
///
/// ```rust
/// use zzcombat::GameAction;
///
/// let wait = GameAction::new("wait").with_description("Do nothing").with_cost(0);
/// assert_eq!(wait.name(), "wait");
/// assert!(wait.children().is_empty());
/// ```
#[derive(Clone)]
pub struct GameAction {
    name: String,
    description: String,
    base_cost: i32,
    range: u32,
    children: Vec<Arc<dyn Action>>,
}

impl GameAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            base_cost: 1,
            range: 1,
            children: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_cost(mut self, base_cost: i32) -> Self {
        self.base_cost = base_cost;
        self
    }

    pub fn with_range(mut self, range: u32) -> Self {
        self.range = range;
        self
    }

    pub fn with_child(mut self, child: Arc<dyn Action>) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn base_cost(&self) -> i32 {
        self.base_cost
    }

    pub fn range(&self) -> u32 {
        self.range
    }

    pub fn children(&self) -> &[Arc<dyn Action>] {
        &self.children
    }

    /// A fresh context for running this action.
    pub fn context(&self, source: impl Into<EntityId>, target: Target) -> ActionContext {
        ActionContext::new(source, target, &self.name)
    }

    /// The source must be in the encounter and not knocked out.
    pub fn can_execute(&self, source: &EntityId, encounter: &Encounter) -> bool {
        encounter
            .find_character(source)
            .is_some_and(|c| c.is_alive())
    }
}

impl Action for GameAction {
    fn execute(&self, ctx: &ActionContext, encounter: &mut Encounter) -> Result<(), CombatError> {
        debug!(
            action = %self.name,
            source = %ctx.source(),
            target = %ctx.target().entity,
            "executing action"
        );
        for child in &self.children {
            child.execute(ctx, encounter)?;
        }
        Ok(())
    }

    fn approximate(
        &self,
        ctx: &ActionContext,
        encounter: &Encounter,
    ) -> Result<ActionApproximation, CombatError> {
        let mut total = ActionApproximation::new();
        for child in &self.children {
            total.merge(&child.approximate(ctx, encounter)?);
        }
        Ok(total)
    }
}

impl fmt::Debug for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameAction")
            .field("name", &self.name)
            .field("base_cost", &self.base_cost)
            .field("range", &self.range)
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::config::EncounterConfig;
    use crate::vitals::Vitals;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Action for Counter {
        fn execute(&self, _: &ActionContext, _: &mut Encounter) -> Result<(), CombatError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn approximate(
            &self,
            ctx: &ActionContext,
            _: &Encounter,
        ) -> Result<ActionApproximation, CombatError> {
            let mut a = ActionApproximation::new();
            a.add_damage(&ctx.target().entity, 2);
            Ok(a)
        }
    }

    #[test]
    fn test_game_action_runs_every_child() {
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        let action = GameAction::new("double")
            .with_child(first.clone())
            .with_child(second.clone());

        let mut enc = Encounter::new(EncounterConfig::default());
        let ctx = action.context("a", Target::entity("b"));
        action.execute(&ctx, &mut enc).unwrap();
        assert_eq!(first.0.load(Ordering::SeqCst), 1);
        assert_eq!(second.0.load(Ordering::SeqCst), 1);

        let approx = action.approximate(&ctx, &enc).unwrap();
        assert_eq!(approx.damage_to(&EntityId::from_str("b")), 4);
    }

    #[test]
    fn test_can_execute_requires_live_source() {
        let mut enc = Encounter::new(EncounterConfig::default());
        let mut vitals = Vitals::with_health(5).unwrap();
        vitals.take_damage(5).unwrap();
        enc.add_character(Character::new("down", "Down").with_vitals(vitals))
            .unwrap();
        enc.add_character(Character::new("up", "Up")).unwrap();

        let action = GameAction::new("poke");
        assert!(action.can_execute(&EntityId::from_str("up"), &enc));
        assert!(!action.can_execute(&EntityId::from_str("down"), &enc));
        assert!(!action.can_execute(&EntityId::from_str("gone"), &enc));
    }
}
