//! Status effects.
//!
//! A status effect is a named bundle of stat modifiers. Applying it tags
//! every modifier with the effect id as source, so removal is a single
//! `remove_all_modifiers_from(id)`.

use crate::category::StatCategory;
use crate::modifier::{Modifier, ModifierKind};
use serde::{Deserialize, Serialize};

/// One stat adjustment inside a status effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectModifier {
    pub category: StatCategory,
    #[serde(flatten)]
    pub kind: ModifierKind,
}

/// A named bundle of modifiers (a buff or a debuff).
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Modifier, StatCategory, StatusEffect};
///
/// let shield = StatusEffect::new("shield_of_faith")
///     .with_modifier(StatCategory::armor_class(), Modifier::flat(2, "").kind);
///
/// let (category, modifier) = shield.modifiers_tagged().next().unwrap();
/// assert_eq!(category, &StatCategory::armor_class());
/// assert_eq!(modifier.source, "shield_of_faith");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub id: String,
    #[serde(default)]
    pub modifiers: Vec<EffectModifier>,
}

impl StatusEffect {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            modifiers: Vec::new(),
        }
    }

    pub fn with_modifier(mut self, category: StatCategory, kind: ModifierKind) -> Self {
        self.modifiers.push(EffectModifier { category, kind });
        self
    }

    /// The effect's modifiers, each tagged with this effect as source.
    pub fn modifiers_tagged(&self) -> impl Iterator<Item = (&StatCategory, Modifier)> {
        self.modifiers
            .iter()
            .map(|m| (&m.category, Modifier::new(m.kind.clone(), self.id.clone())))
    }
}
