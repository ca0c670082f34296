//! Stat breakdown module.
//!
//! Contains the `StatBreakdown` type, a step-by-step record of how a stat's
//! value was derived, for debugging and tooltips.

use crate::category::StatCategory;
use crate::modifier::PipelineStep;
use crate::numeric::StatValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A derived stat value with its full pipeline breakdown.
///
/// Read-only and serializable.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Modifier, Stat, StatCategory, StatValue};
///
/// let mut str_stat = Stat::new(StatCategory::from_str("STR"), 10);
/// str_stat.add_modifier(Modifier::flat(5, "belt")).unwrap();
///
/// let breakdown = str_stat.breakdown();
/// assert_eq!(breakdown.steps.len(), 1);
/// assert_eq!(breakdown.value, StatValue::Int(15));
/// assert_eq!(breakdown.to_string(), "STR: base 10\n  flat +5 (belt) -> 15\n  = 15");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatBreakdown {
    pub category: StatCategory,
    pub base: StatValue,
    /// Modifiers that took part, in pipeline order, each with the running
    /// value after it applied.
    pub steps: Vec<PipelineStep>,
    /// Pipeline result before the stat's bounds.
    pub unbounded: StatValue,
    /// Value as read from the stat.
    pub value: StatValue,
}

impl StatBreakdown {
    /// Whether the stat's bounds changed the pipeline result.
    pub fn was_bounded(&self) -> bool {
        self.unbounded != self.value
    }
}

impl fmt::Display for StatBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: base {}", self.category, self.base)?;
        for step in &self.steps {
            write!(f, "\n  {} -> {}", step.description, step.value)?;
        }
        if self.was_bounded() {
            write!(f, "\n  bounds -> {}", self.value)?;
        }
        write!(f, "\n  = {}", self.value)
    }
}
