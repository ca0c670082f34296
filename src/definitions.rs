//! Persisted definitions.
//!
//! A [`DefinitionSet`] is the JSON form of a game's templates: stat types,
//! status effects, action trees and characters. [`ActionLibrary::build`]
//! turns it into shared runtime objects.
//!
//! Actions can embed other actions by id (`{ "action": "slash" }` in place
//! of a node). These references form a graph that must be acyclic; actions
//! are built in dependency order so every reference resolves to the same
//! `Arc<GameAction>`.
//!
//! # Examples
//!
//! ```rust
//! use zzcombat::{ActionLibrary, DefinitionSet, EntityId};
//!
//! let json = r#"{
//!     "stat_types": [{ "name": "AC", "kind": "int" }],
//!     "actions": [{
//!         "id": "bite",
//!         "children": [{ "effect": { "type": "damage", "amount": 3, "damage_type": "Physical" } }]
//!     }],
//!     "characters": [{
//!         "id": "rat", "name": "Rat", "health": 4,
//!         "stats": { "AC": 10 }, "actions": ["bite"]
//!     }]
//! }"#;
//!
//! let defs = DefinitionSet::from_json(json).unwrap();
//! let library = ActionLibrary::build(&defs, None).unwrap();
//! let rat = library.build_character(&defs.characters[0]).unwrap();
//! assert_eq!(rat.actions().unwrap()[0].name(), "bite");
//! assert_eq!(rat.id(), &EntityId::from_str("rat"));
//! ```

use crate::action::{Action, GameAction};
use crate::category::StatCategory;
use crate::character::Character;
use crate::effects::{ApplyEffect, DealDamage, Heal, NodeEffect, StatScaling};
use crate::encounter::Encounter;
use crate::entity::EntityId;
use crate::error::CombatError;
use crate::graph::ActionGraph;
use crate::grid::{SpatialQuery, Tile, TileShape};
use crate::node::ActionNode;
use crate::numeric::{StatValue, ValueKind};
use crate::registry::StatsRegistry;
use crate::roll::{AttackRoll, Outcome, RollResolver, SavingThrow};
use crate::stat::Stat;
use crate::status::StatusEffect;
use crate::targeting::{AreaTarget, ContextTarget, SelfTarget, TargetFilter, TargetingSelector};
use crate::vitals::{DamageType, Resistances, Vitals};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Everything a game defines up front.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionSet {
    pub stat_types: Vec<StatTypeDef>,
    pub effects: Vec<StatusEffect>,
    pub actions: Vec<ActionDef>,
    pub characters: Vec<CharacterDef>,
}

impl DefinitionSet {
    pub fn from_json(json: &str) -> Result<Self, CombatError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A stat type: its category name, value kind and optional bounds.
///
/// Bounds come in pairs; giving only one is a definition error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatTypeDef {
    pub name: String,
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<StatValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<StatValue>,
}

impl StatTypeDef {
    /// A stat of this type with the given base value.
    pub fn instantiate(&self, base: StatValue) -> Result<Stat, CombatError> {
        let stat = Stat::with_kind(StatCategory::from_str(&self.name), self.kind, base)?;
        match (self.min, self.max) {
            (None, None) => Ok(stat),
            (Some(min), Some(max)) => stat.with_bounds(min, max),
            _ => Err(CombatError::Definition(format!(
                "stat type {} needs both min and max",
                self.name
            ))),
        }
    }
}

fn default_cost() -> i32 {
    1
}

fn default_range() -> u32 {
    1
}

/// A root action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_cost")]
    pub base_cost: i32,
    #[serde(default = "default_range")]
    pub range: u32,
    #[serde(default)]
    pub children: Vec<ChildDef>,
}

/// A child slot: either another action by id or an inline node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildDef {
    Action(ActionRef),
    Node(NodeDef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionRef {
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeDef {
    pub label: Option<String>,
    pub roll: Option<RollDef>,
    pub targeting: Option<TargetingDef>,
    pub effect: Option<EffectDef>,
    /// Children per outcome. Nodes without a roll use `None`.
    pub children: BTreeMap<Outcome, Vec<ChildDef>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollDef {
    Attack {
        #[serde(default)]
        defense_stat: Option<StatCategory>,
        #[serde(default)]
        bonus_stat: Option<StatCategory>,
    },
    Save {
        difficulty_class: i32,
        #[serde(default)]
        save_stat: Option<StatCategory>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetingDef {
    #[serde(rename = "self")]
    Source,
    Context,
    Area {
        area: TileShape,
        #[serde(default)]
        filter: TargetFilter,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectDef {
    Damage {
        amount: i32,
        damage_type: DamageType,
        #[serde(default)]
        scaling: Vec<StatScaling>,
    },
    Heal {
        amount: i32,
    },
    /// Apply a status effect by id.
    ApplyEffect {
        effect: String,
    },
}

/// A character template.
///
/// `health` grants vitals and resistances (an entity without health cannot
/// be damaged). Absent `stats` or `actions` leave those capabilities off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDef {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub tile: Option<Tile>,
    #[serde(default)]
    pub stats: Option<BTreeMap<String, StatValue>>,
    #[serde(default)]
    pub health: Option<i32>,
    #[serde(default)]
    pub regeneration: Option<i32>,
    #[serde(default)]
    pub resistances: BTreeMap<DamageType, i32>,
    #[serde(default)]
    pub actions: Option<Vec<String>>,
}

/// Built templates, ready to hand to characters.
pub struct ActionLibrary {
    stat_types: BTreeMap<String, StatTypeDef>,
    effects: BTreeMap<String, StatusEffect>,
    actions: BTreeMap<String, Arc<GameAction>>,
    characters: Vec<CharacterDef>,
    spatial: Option<Arc<dyn SpatialQuery>>,
}

impl std::fmt::Debug for ActionLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionLibrary")
            .field("stat_types", &self.stat_types.keys().collect::<Vec<_>>())
            .field("effects", &self.effects.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("characters", &self.characters.len())
            .finish()
    }
}

impl ActionLibrary {
    /// Validate and build every action.
    ///
    /// `spatial` backs area targeting; a definition using area targeting
    /// without one is rejected.
    ///
    /// # Errors
    ///
    /// - `UnknownAction` for a reference to an undefined action
    /// - `Cycle` if actions reference each other in a loop
    /// - `UnknownEffect` for an `apply_effect` naming an undefined effect
    /// - `Definition` for duplicate ids or area targeting without a spatial
    ///   service
    pub fn build(
        defs: &DefinitionSet,
        spatial: Option<Arc<dyn SpatialQuery>>,
    ) -> Result<Self, CombatError> {
        let mut library = ActionLibrary {
            stat_types: BTreeMap::new(),
            effects: BTreeMap::new(),
            actions: BTreeMap::new(),
            characters: defs.characters.clone(),
            spatial,
        };

        for stat_type in &defs.stat_types {
            if library
                .stat_types
                .insert(stat_type.name.clone(), stat_type.clone())
                .is_some()
            {
                return Err(duplicate("stat type", &stat_type.name));
            }
        }
        for effect in &defs.effects {
            if library
                .effects
                .insert(effect.id.clone(), effect.clone())
                .is_some()
            {
                return Err(duplicate("effect", &effect.id));
            }
        }

        let mut by_id: BTreeMap<&str, &ActionDef> = BTreeMap::new();
        for action in &defs.actions {
            if by_id.insert(&action.id, action).is_some() {
                return Err(duplicate("action", &action.id));
            }
        }

        let mut graph = ActionGraph::new();
        for action in &defs.actions {
            graph.add_node(&action.id);
            let mut references = Vec::new();
            collect_references(&action.children, &mut references);
            for reference in references {
                if !by_id.contains_key(reference) {
                    return Err(CombatError::UnknownAction(reference.to_string()));
                }
                graph.add_dependency(&action.id, reference);
            }
        }

        for id in graph.build_order()? {
            let Some(def) = by_id.get(id.as_str()) else {
                continue;
            };
            let action = library.build_action(def)?;
            debug!(action = %id, children = action.children().len(), "action built");
            library.actions.insert(id, Arc::new(action));
        }
        Ok(library)
    }

    pub fn action(&self, id: &str) -> Result<Arc<GameAction>, CombatError> {
        self.actions
            .get(id)
            .cloned()
            .ok_or_else(|| CombatError::UnknownAction(id.to_string()))
    }

    pub fn effect(&self, id: &str) -> Result<&StatusEffect, CombatError> {
        self.effects
            .get(id)
            .ok_or_else(|| CombatError::UnknownEffect(id.to_string()))
    }

    pub fn stat_type(&self, name: &str) -> Result<&StatTypeDef, CombatError> {
        self.stat_types
            .get(name)
            .ok_or_else(|| CombatError::UnknownStatType(name.to_string()))
    }

    /// Ids of every built action, sorted.
    pub fn action_ids(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Instantiate a character from its template.
    pub fn build_character(&self, def: &CharacterDef) -> Result<Character, CombatError> {
        let mut character = Character::new(def.id.clone(), def.name.clone());
        if let Some(team) = &def.team {
            character = character.with_team(team.clone());
        }
        if let Some(tile) = def.tile {
            character = character.with_tile(tile);
        }

        if let Some(stats) = &def.stats {
            let mut registry = StatsRegistry::new();
            for (name, base) in stats {
                registry.insert(self.stat_type(name)?.instantiate(*base)?);
            }
            character = character.with_stats(registry);
        }

        if let Some(health) = def.health {
            let mut vitals = Vitals::with_health(health)?;
            if let Some(per_tick) = def.regeneration {
                vitals = vitals.with_regeneration(per_tick);
            }
            let resistances = def
                .resistances
                .iter()
                .fold(Resistances::new(), |r, (damage_type, amount)| {
                    r.with(*damage_type, *amount)
                });
            character = character.with_vitals(vitals).with_resistances(resistances);
        }

        if let Some(ids) = &def.actions {
            let actions = ids
                .iter()
                .map(|id| self.action(id))
                .collect::<Result<Vec<_>, _>>()?;
            character = character.with_actions(actions);
        }
        Ok(character)
    }

    /// Add every defined character to `encounter`.
    pub fn populate(&self, encounter: &mut Encounter) -> Result<(), CombatError> {
        for def in &self.characters {
            encounter.add_character(self.build_character(def)?)?;
        }
        Ok(())
    }

    fn build_action(&self, def: &ActionDef) -> Result<GameAction, CombatError> {
        let mut action = GameAction::new(def.id.clone())
            .with_description(def.description.clone())
            .with_cost(def.base_cost)
            .with_range(def.range);
        for (index, child) in def.children.iter().enumerate() {
            let label = format!("{}.{}", def.id, index);
            action = action.with_child(self.build_child(child, &label)?);
        }
        Ok(action)
    }

    fn build_child(&self, def: &ChildDef, label: &str) -> Result<Arc<dyn Action>, CombatError> {
        match def {
            ChildDef::Action(reference) => {
                let action: Arc<dyn Action> = self.action(&reference.action)?;
                Ok(action)
            }
            ChildDef::Node(node) => Ok(Arc::new(self.build_node(node, label)?)),
        }
    }

    fn build_node(&self, def: &NodeDef, fallback_label: &str) -> Result<ActionNode, CombatError> {
        let label = def.label.as_deref().unwrap_or(fallback_label);
        let mut builder = ActionNode::builder(label);
        if let Some(roll) = &def.roll {
            builder = builder.with_roll(build_roll(roll));
        }
        if let Some(targeting) = &def.targeting {
            builder = builder.with_targeting(self.build_targeting(targeting)?);
        }
        if let Some(effect) = &def.effect {
            builder = builder.with_effect(self.build_effect(effect)?);
        }
        for (outcome, children) in &def.children {
            for (index, child) in children.iter().enumerate() {
                let child_label = format!("{}.{:?}.{}", label, outcome, index);
                builder = builder.on_result(*outcome, self.build_child(child, &child_label)?);
            }
        }
        Ok(builder.build())
    }

    fn build_targeting(
        &self,
        def: &TargetingDef,
    ) -> Result<Arc<dyn TargetingSelector>, CombatError> {
        Ok(match def {
            TargetingDef::Source => Arc::new(SelfTarget),
            TargetingDef::Context => Arc::new(ContextTarget),
            TargetingDef::Area { area, filter } => {
                let spatial = self.spatial.clone().ok_or_else(|| {
                    CombatError::Definition("area targeting needs a spatial service".to_string())
                })?;
                Arc::new(AreaTarget::new(area.clone(), *filter, spatial))
            }
        })
    }

    fn build_effect(&self, def: &EffectDef) -> Result<Arc<dyn NodeEffect>, CombatError> {
        Ok(match def {
            EffectDef::Damage {
                amount,
                damage_type,
                scaling,
            } => Arc::new(DealDamage {
                amount: *amount,
                damage_type: *damage_type,
                scaling: scaling.clone(),
            }),
            EffectDef::Heal { amount } => Arc::new(Heal::new(*amount)),
            EffectDef::ApplyEffect { effect } => Arc::new(ApplyEffect(self.effect(effect)?.clone())),
        })
    }
}

fn build_roll(def: &RollDef) -> Arc<dyn RollResolver> {
    match def {
        RollDef::Attack {
            defense_stat,
            bonus_stat,
        } => {
            let mut roll = AttackRoll::default();
            if let Some(category) = defense_stat {
                roll.defense_stat = category.clone();
            }
            if let Some(category) = bonus_stat {
                roll.bonus_stat = category.clone();
            }
            Arc::new(roll)
        }
        RollDef::Save {
            difficulty_class,
            save_stat,
        } => Arc::new(SavingThrow {
            difficulty_class: *difficulty_class,
            save_stat: save_stat.clone(),
        }),
    }
}

fn collect_references<'a>(children: &'a [ChildDef], out: &mut Vec<&'a str>) {
    for child in children {
        match child {
            ChildDef::Action(reference) => out.push(&reference.action),
            ChildDef::Node(node) => {
                for nested in node.children.values() {
                    collect_references(nested, out);
                }
            }
        }
    }
}

fn duplicate(what: &str, id: &str) -> CombatError {
    CombatError::Definition(format!("duplicate {} id {}", what, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::OccupancyGrid;

    #[test]
    fn test_child_forms() {
        let children: Vec<ChildDef> = serde_json::from_str(
            r#"[
                { "action": "jab" },
                { "label": "swing", "roll": { "type": "attack" },
                  "children": { "Success": [{ "action": "jab" }] } }
            ]"#,
        )
        .unwrap();
        assert_eq!(
            children[0],
            ChildDef::Action(ActionRef {
                action: "jab".into()
            })
        );
        match &children[1] {
            ChildDef::Node(node) => {
                assert_eq!(node.label.as_deref(), Some("swing"));
                assert_eq!(node.children[&Outcome::Success].len(), 1);
            }
            other => panic!("expected node, got {:?}", other),
        }
    }

    #[test]
    fn test_stat_type_bounds() {
        let bounded = StatTypeDef {
            name: "Luck".into(),
            kind: ValueKind::Int,
            min: Some(StatValue::Int(0)),
            max: Some(StatValue::Int(5)),
        };
        assert_eq!(bounded.instantiate(StatValue::Int(9)).unwrap().value(), StatValue::Int(5));

        let half = StatTypeDef {
            max: None,
            ..bounded
        };
        assert!(matches!(
            half.instantiate(StatValue::Int(1)),
            Err(CombatError::Definition(_))
        ));
    }

    #[test]
    fn test_references_share_the_template() {
        let defs = DefinitionSet::from_json(
            r#"{ "actions": [
                { "id": "combo", "children": [{ "action": "jab" }, { "action": "jab" }] },
                { "id": "jab" }
            ] }"#,
        )
        .unwrap();
        let library = ActionLibrary::build(&defs, None).unwrap();
        let combo = library.action("combo").unwrap();
        assert_eq!(combo.children().len(), 2);
        assert_eq!(library.action_ids().collect::<Vec<_>>(), ["combo", "jab"]);
        assert!(Arc::ptr_eq(&combo.children()[0], &combo.children()[1]));
    }

    #[test]
    fn test_area_targeting_needs_spatial_service() {
        let defs = DefinitionSet::from_json(
            r#"{ "actions": [{ "id": "nova", "children": [{
                "targeting": { "type": "area", "area": { "shape": "diamond", "radius": 1 } }
            }] }] }"#,
        )
        .unwrap();
        assert!(matches!(
            ActionLibrary::build(&defs, None),
            Err(CombatError::Definition(_))
        ));
        assert!(ActionLibrary::build(&defs, Some(Arc::new(OccupancyGrid::new()))).is_ok());
    }

    #[test]
    fn test_unknown_effect_and_duplicates() {
        let defs = DefinitionSet::from_json(
            r#"{ "actions": [{ "id": "curse", "children": [{
                "effect": { "type": "apply_effect", "effect": "hex" }
            }] }] }"#,
        )
        .unwrap();
        assert_eq!(
            ActionLibrary::build(&defs, None).unwrap_err(),
            CombatError::UnknownEffect("hex".into())
        );

        let defs = DefinitionSet::from_json(r#"{ "actions": [{ "id": "a" }, { "id": "a" }] }"#)
            .unwrap();
        assert!(matches!(
            ActionLibrary::build(&defs, None),
            Err(CombatError::Definition(_))
        ));
    }
}
