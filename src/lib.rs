//! # zzcombat - Turn-Based Combat Rules Engine
//!
//! A rules core for tactical RPG combat that provides:
//! - **Layered stats** (setters, flat bonuses, percentages and clamps applied
//!   in a fixed phase order)
//! - **d20 rolls** with exact outcome probabilities
//! - **Action trees** that can be executed or approximated (expected damage,
//!   healing, kills and status effects without side effects)
//! - **Damage and healing pipeline** with per-type resistances and events
//!
//! ## Core Concepts
//!
//! ### Stat Pipeline
//!
//! ```text
//! base → [Setter] → [Flat] → [Percentage] → [ClampFloor] → [ClampCeiling] → bounds
//! ```
//!
//! Every mutation recomputes the value from the base, so removing a modifier
//! restores exactly what it changed.
//!
//! ### Action Trees
//!
//! A [`GameAction`] owns a list of children. Each [`ActionNode`] selects its
//! targets, rolls, applies its effect and then runs the children registered
//! under the roll's [`Outcome`]. Approximation walks the same tree, weighting
//! each outcome branch by its probability.
//!
//! ## Example
//!
//! ```rust
//! use zzcombat::*;
//!
//! let mut stats = StatsRegistry::new();
//! stats.insert(Stat::new(StatCategory::from_str("STR"), 10));
//!
//! let str_id = StatCategory::from_str("STR");
//! let belt = stats.add_modifier(&str_id, Modifier::flat(4, "belt")).unwrap();
//! stats.add_modifier(&str_id, Modifier::percentage(50, "rage")).unwrap();
//! assert_eq!(stats.value(&str_id).unwrap(), StatValue::Int(21)); // (10 + 4) * 1.5
//!
//! stats.remove_modifier(&str_id, belt).unwrap();
//! assert_eq!(stats.value(&str_id).unwrap(), StatValue::Int(15));
//! ```
//!
//! ## Modules
//!
//! - [`modifier`] - Modifier kinds, phases and the modifier set pipeline
//! - [`stat`] - Stats and resource stats
//! - [`registry`] - Per-entity stat registry
//! - [`roll`] - d20 rolls, outcome probabilities and roll resolvers
//! - [`node`] - Action nodes (the branching unit of action trees)
//! - [`damage`] - Damage and healing pipeline
//! - [`events`] - Typed event bus
//! - [`definitions`] - JSON definitions and the action library
//! - [`ai`] - Approximation-driven character AI
//! - [`error`] - Error types

pub mod action;
pub mod ai;
pub mod approximation;
pub mod breakdown;
pub mod category;
pub mod character;
pub mod config;
pub mod context;
pub mod damage;
pub mod definitions;
pub mod effects;
pub mod encounter;
pub mod entity;
pub mod error;
pub mod events;
pub mod graph;
pub mod grid;
pub mod modifier;
pub mod node;
pub mod numeric;
pub mod registry;
pub mod roll;
pub mod stat;
pub mod status;
pub mod targeting;
pub mod vitals;

// Re-export main types for convenience
pub use action::{Action, GameAction};
pub use approximation::ActionApproximation;
pub use breakdown::StatBreakdown;
pub use category::StatCategory;
pub use character::{Capability, Character};
pub use config::{EncounterConfig, ScoringWeights};
pub use context::{ActionContext, TriggerContext};
pub use encounter::Encounter;
pub use entity::{EntityId, Target};
pub use error::CombatError;
pub use node::{ActionNode, ActionNodeBuilder};
pub use registry::StatsRegistry;
pub use stat::{ResourceStat, Stat, StatBounds};
pub use status::{EffectModifier, StatusEffect};
pub use vitals::{DamageType, Resistances, Vitals};

// Re-export the modifier pipeline and values
pub use modifier::{
    Modifier, ModifierHandle, ModifierKind, ModifierPhase, ModifierSet, ModifierStrategy,
    PipelineStep,
};
pub use numeric::{StatValue, ValueKind};

// Re-export rolls, effects and targeting
pub use effects::{ApplyEffect, DealDamage, Heal, NodeEffect, StatScaling};
pub use grid::{OccupancyGrid, SpatialQuery, Tile, TileShape};
pub use roll::{
    AttackRoll, Dice, Outcome, OutcomeChances, RollCheck, RollRecord, RollResolver, SavingThrow,
};
pub use targeting::{
    AreaTarget, ContextTarget, FixedTargets, SelfTarget, TargetFilter, TargetingSelector,
};

// Re-export events, definitions and AI
pub use ai::{ActionScorer, CharacterAi, Evaluation, WeightedScorer};
pub use definitions::{ActionLibrary, CharacterDef, DefinitionSet};
pub use events::{
    CharacterDowned, DamageDealt, DamageTaken, EventBus, Healed, HealingDone, Scope, Subscription,
};
