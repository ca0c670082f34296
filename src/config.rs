//! Encounter configuration.
//!
//! Loaded from JSON; every field has a default, so `{}` is a valid
//! configuration.

use crate::error::CombatError;
use serde::{Deserialize, Serialize};

/// Weights the default AI scorer applies to an action approximation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Per point of damage.
    pub damage: f64,
    /// Per point of healing.
    pub healing: f64,
    /// Per unit of kill probability.
    pub kill: f64,
    /// Per unit of status-effect probability.
    pub effect: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            damage: 1.0,
            healing: 1.0,
            kill: 10.0,
            effect: 2.0,
        }
    }
}

/// Settings for one encounter.
///
/// # Examples
///
/// ```rust
/// use zzcombat::EncounterConfig;
///
/// let config = EncounterConfig::from_json(r#"{ "seed": 42, "scoring": { "kill": 25.0 } }"#).unwrap();
/// assert_eq!(config.seed, Some(42));
/// assert_eq!(config.max_actions_per_turn, 8);
/// assert_eq!(config.scoring.kill, 25.0);
/// assert_eq!(config.scoring.damage, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Fixed dice seed. Entropy-seeded when absent.
    pub seed: Option<u64>,
    /// Upper bound on actions the AI takes in one turn.
    pub max_actions_per_turn: usize,
    pub scoring: ScoringWeights,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_actions_per_turn: 8,
            scoring: ScoringWeights::default(),
        }
    }
}

impl EncounterConfig {
    pub fn from_json(json: &str) -> Result<Self, CombatError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(
            EncounterConfig::from_json("{}").unwrap(),
            EncounterConfig::default()
        );
    }

    #[test]
    fn test_malformed_json_is_definition_error() {
        let err = EncounterConfig::from_json(r#"{ "seed": "abc" }"#).unwrap_err();
        assert!(matches!(err, CombatError::Definition(_)));
    }
}
