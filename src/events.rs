//! Event bus module.
//!
//! A type-keyed publish/subscribe bus owned by the [`Encounter`]. Dispatch is
//! synchronous and reentrant: handlers may subscribe, unsubscribe and
//! publish while an event is in flight.
//!
//! Each dispatch takes a snapshot of the matching subscribers, releases the
//! registry, and checks every snapshot entry is still registered right
//! before calling it. A handler added during dispatch misses the in-flight
//! event. A handler removed during dispatch is skipped.
//!
//! [`Encounter`]: crate::Encounter

use crate::entity::EntityId;
use crate::vitals::DamageType;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Which publications a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Every publication of the event type.
    Any,
    /// Publications addressed to this entity.
    Entity(EntityId),
}

impl Scope {
    fn matches(&self, entity: &EntityId) -> bool {
        match self {
            Scope::Any => true,
            Scope::Entity(id) => id == entity,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    event: TypeId,
}

type Handler = Rc<dyn Fn(&dyn Any)>;

#[derive(Clone)]
struct Binding {
    id: u64,
    scope: Scope,
    handler: Handler,
}

/// Synchronous, type-keyed event bus.
///
/// # Examples
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use zzcombat::{EntityId, EventBus, Scope};
///
/// struct Ping(u32);
///
/// let bus = EventBus::new();
/// let seen = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&seen);
/// let sub = bus.subscribe(Scope::Any, move |p: &Ping| sink.set(sink.get() + p.0));
///
/// let hero = EntityId::from_str("hero");
/// assert_eq!(bus.publish(&hero, &Ping(3)), 1);
/// bus.unsubscribe(&sub);
/// assert_eq!(bus.publish(&hero, &Ping(3)), 0);
/// assert_eq!(seen.get(), 3);
/// ```
#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    bindings: RefCell<HashMap<TypeId, Vec<Binding>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events of type `E`.
    pub fn subscribe<E, F>(&self, scope: Scope, handler: F) -> Subscription
    where
        E: 'static,
        F: Fn(&E) + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let event = TypeId::of::<E>();
        let handler: Handler = Rc::new(move |any: &dyn Any| {
            if let Some(e) = any.downcast_ref::<E>() {
                handler(e);
            }
        });
        self.bindings
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(Binding { id, scope, handler });
        Subscription { id, event }
    }

    /// Remove a subscription. Returns whether it was registered.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut bindings = self.bindings.borrow_mut();
        let Some(list) = bindings.get_mut(&subscription.event) else {
            return false;
        };
        let before = list.len();
        list.retain(|b| b.id != subscription.id);
        before != list.len()
    }

    /// Deliver `event`, addressed to `entity`, to every matching handler.
    ///
    /// Returns how many handlers ran.
    pub fn publish<E: 'static>(&self, entity: &EntityId, event: &E) -> usize {
        let event_type = TypeId::of::<E>();
        let snapshot: Vec<Binding> = match self.bindings.borrow().get(&event_type) {
            Some(list) => list
                .iter()
                .filter(|b| b.scope.matches(entity))
                .cloned()
                .collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for binding in snapshot {
            if !self.is_live(event_type, binding.id) {
                continue;
            }
            (binding.handler)(event);
            delivered += 1;
        }
        trace!(
            event = std::any::type_name::<E>(),
            %entity,
            delivered,
            "event published"
        );
        delivered
    }

    /// Number of handlers registered for `E`, in any scope.
    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.bindings
            .borrow()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.bindings.borrow_mut().clear();
    }

    fn is_live(&self, event: TypeId, id: u64) -> bool {
        self.bindings
            .borrow()
            .get(&event)
            .is_some_and(|list| list.iter().any(|b| b.id == id))
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total: usize = self.bindings.borrow().values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("subscriptions", &total)
            .finish()
    }
}

/// Published to the receiver when it takes damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageTaken {
    pub target: EntityId,
    pub source: EntityId,
    pub amount: i32,
    pub by_type: BTreeMap<DamageType, i32>,
}

/// Published to the source when its damage lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageDealt {
    pub source: EntityId,
    pub target: EntityId,
    pub amount: i32,
}

/// Published to the receiver of healing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Healed {
    pub target: EntityId,
    pub source: EntityId,
    pub amount: i32,
}

/// Published to the source of healing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingDone {
    pub source: EntityId,
    pub target: EntityId,
    pub amount: i32,
}

/// Published to a character the first time its health reaches zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDowned {
    pub entity: EntityId,
    pub by: EntityId,
}
