//! Action context module.
//!
//! An [`ActionContext`] is the immutable value threaded through an action
//! tree: who acts, at whom, under which root action. Retargeting produces a
//! new context. The [`TriggerContext`] is the one piece shared across those
//! copies, so triggered effects can fire once per traversal.

use crate::entity::{EntityId, Target};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

/// Records which triggers already fired during one action.
#[derive(Debug, Default)]
pub struct TriggerContext {
    activated: HashSet<(String, EntityId)>,
}

impl TriggerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `trigger` as fired on `target`. Returns `false` if it already
    /// fired there.
    pub fn can_activate(&mut self, trigger: &str, target: &EntityId) -> bool {
        self.activated.insert((trigger.to_string(), target.clone()))
    }

    pub fn activation_count(&self) -> usize {
        self.activated.len()
    }
}

/// Who does what to whom.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{ActionContext, EntityId, Target};
///
/// let ctx = ActionContext::new("hero", Target::entity("orc"), "cleave");
/// let next = ctx.with_target(Target::entity("goblin"));
///
/// assert_eq!(ctx.target().entity.as_str(), "orc");
/// assert_eq!(next.target().entity.as_str(), "goblin");
/// assert_eq!(next.root_action(), "cleave");
///
/// // Trigger bookkeeping is shared between the two.
/// assert!(ctx.try_activate("riposte", &EntityId::from_str("orc")));
/// assert!(!next.try_activate("riposte", &EntityId::from_str("orc")));
/// ```
#[derive(Debug, Clone)]
pub struct ActionContext {
    source: EntityId,
    target: Target,
    trigger: Rc<RefCell<TriggerContext>>,
    root: Arc<str>,
}

impl ActionContext {
    /// A fresh context with its own trigger bookkeeping.
    pub fn new(source: impl Into<EntityId>, target: Target, root_action: &str) -> Self {
        Self {
            source: source.into(),
            target,
            trigger: Rc::new(RefCell::new(TriggerContext::new())),
            root: Arc::from(root_action),
        }
    }

    pub fn source(&self) -> &EntityId {
        &self.source
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn root_action(&self) -> &str {
        &self.root
    }

    pub fn trigger_context(&self) -> Rc<RefCell<TriggerContext>> {
        Rc::clone(&self.trigger)
    }

    pub fn with_target(&self, target: Target) -> Self {
        Self {
            target,
            ..self.clone()
        }
    }

    pub fn with_source(&self, source: EntityId) -> Self {
        Self {
            source,
            ..self.clone()
        }
    }

    pub fn with_trigger_context(&self, trigger: Rc<RefCell<TriggerContext>>) -> Self {
        Self {
            trigger,
            ..self.clone()
        }
    }

    /// Fire `trigger` on `target` unless it already fired in this
    /// traversal.
    pub fn try_activate(&self, trigger: &str, target: &EntityId) -> bool {
        self.trigger.borrow_mut().can_activate(trigger, target)
    }
}
