//! Error types for the combat core.
//!
//! All errors that can occur while building stats, loading definitions or
//! running action trees are represented by the `CombatError` enum.

use crate::category::StatCategory;
use crate::character::Capability;
use crate::entity::EntityId;
use crate::modifier::{ModifierPhase, ModifierStrategy};
use crate::numeric::ValueKind;
use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[String]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.join(" -> ")
}

/// Errors that can occur in the combat core.
///
/// Errors fall in two classes. Configuration errors (bad modifiers, missing
/// stats, broken definitions) are rejected at the call site. Missing
/// capabilities (a target that cannot receive damage, an entity that left
/// the encounter) are [recoverable](CombatError::is_recoverable): action
/// traversal skips the affected target and keeps going.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{CombatError, StatCategory};
///
/// let err = CombatError::MissingStat(StatCategory::armor_class());
/// assert_eq!(err.to_string(), "Missing stat: AC");
/// assert!(!err.is_recoverable());
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CombatError {
    /// The modifier kind is not accepted by the stat's modifier strategy.
    #[error("Unsupported modifier {phase:?} for {strategy:?} modifier set")]
    UnsupportedModifier {
        phase: ModifierPhase,
        strategy: ModifierStrategy,
    },

    /// A value of the wrong kind was given to a stat or modifier.
    #[error("Value kind mismatch: expected {expected:?}, found {found:?}")]
    ValueKindMismatch { expected: ValueKind, found: ValueKind },

    /// A stat category lookup failed.
    #[error("Missing stat: {0}")]
    MissingStat(StatCategory),

    /// An entity lacks a capability the operation needs.
    #[error("Entity {entity} lacks capability {capability:?}")]
    MissingCapability {
        entity: EntityId,
        capability: Capability,
    },

    /// The entity is not part of the encounter.
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// An entity with the same id is already registered.
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(EntityId),

    /// An action id could not be resolved.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// A status effect id could not be resolved.
    #[error("Unknown effect: {0}")]
    UnknownEffect(String),

    /// A stat type name could not be resolved.
    #[error("Unknown stat type: {0}")]
    UnknownStatType(String),

    /// Action definitions reference each other in a loop.
    #[error("Cycle detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<String> },

    /// Definition data is malformed.
    #[error("Invalid definition: {0}")]
    Definition(String),
}

impl CombatError {
    /// Whether traversal may skip the failing target and continue.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzcombat::{CombatError, EntityId};
    ///
    /// assert!(CombatError::UnknownEntity(EntityId::from_str("ghost")).is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CombatError::MissingCapability { .. } | CombatError::UnknownEntity(_)
        )
    }
}

impl From<serde_json::Error> for CombatError {
    fn from(err: serde_json::Error) -> Self {
        CombatError::Definition(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CombatError::MissingStat(StatCategory::attack_bonus());
        assert!(err.to_string().contains("AttackBonus"));
    }

    #[test]
    fn test_cycle_error_display() {
        let err = CombatError::Cycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        let display = err.to_string();
        assert!(display.contains("Cycle detected"));
        assert!(display.contains("a -> b -> a"));
    }

    #[test]
    fn test_recoverable_classes() {
        let missing = CombatError::MissingCapability {
            entity: EntityId::from_str("rock"),
            capability: Capability::DamageReceiver,
        };
        assert!(missing.is_recoverable());
        assert!(!CombatError::UnknownAction("fireball".into()).is_recoverable());
        assert!(!CombatError::ValueKindMismatch {
            expected: ValueKind::Int,
            found: ValueKind::Bool
        }
        .is_recoverable());
    }
}
