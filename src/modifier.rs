//! Stat modifier module.
//!
//! Modifiers adjust a stat's base value. Every modifier belongs to one
//! [`ModifierPhase`] and phases apply in a fixed order:
//! Setter → Flat → Percentage → ClampFloor → ClampCeiling.
//!
//! Within a phase:
//! - Setter: the largest proposed value replaces the base (for boolean
//!   stats, the most recently added setter wins).
//! - Flat: values are summed.
//! - Percentage: each modifier compounds on the running value, in insertion
//!   order.
//! - ClampFloor (buff clamp): the running value is raised to the highest
//!   floor.
//! - ClampCeiling (debuff clamp): the running value is lowered to the lowest
//!   ceiling.
//!
//! A [`ModifierSet`] never folds modifiers into hidden state. `apply` replays
//! the whole set against the base value, so removing a modifier exactly
//! reverses its contribution.

use crate::error::CombatError;
use crate::numeric::{StatValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the modifier pipeline, in application order.
///
/// # Examples
///
/// ```rust
/// use zzcombat::ModifierPhase;
///
/// assert!(ModifierPhase::Setter < ModifierPhase::Flat);
/// assert!(ModifierPhase::Percentage < ModifierPhase::ClampFloor);
/// assert!(ModifierPhase::ClampFloor < ModifierPhase::ClampCeiling);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModifierPhase {
    Setter,
    Flat,
    Percentage,
    ClampFloor,
    ClampCeiling,
}

/// The adjustment a modifier makes.
///
/// Serialized with a `kind` tag:
///
/// ```json
/// { "kind": "flat", "value": 5 }
/// { "kind": "percentage", "percent": 50 }
/// { "kind": "clamp", "value": 120, "is_buff": false }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierKind {
    /// Override the base value.
    Setter { value: StatValue },
    /// Add to the value.
    Flat { value: StatValue },
    /// Scale by `1 + percent / 100`.
    Percentage { percent: i32 },
    /// Raise the floor (`is_buff`) or lower the ceiling.
    Clamp { value: StatValue, is_buff: bool },
}

impl ModifierKind {
    /// The pipeline phase this kind applies in.
    pub fn phase(&self) -> ModifierPhase {
        match self {
            ModifierKind::Setter { .. } => ModifierPhase::Setter,
            ModifierKind::Flat { .. } => ModifierPhase::Flat,
            ModifierKind::Percentage { .. } => ModifierPhase::Percentage,
            ModifierKind::Clamp { is_buff: true, .. } => ModifierPhase::ClampFloor,
            ModifierKind::Clamp { is_buff: false, .. } => ModifierPhase::ClampCeiling,
        }
    }

    fn payload(&self) -> Option<StatValue> {
        match self {
            ModifierKind::Setter { value }
            | ModifierKind::Flat { value }
            | ModifierKind::Clamp { value, .. } => Some(*value),
            ModifierKind::Percentage { .. } => None,
        }
    }

    fn with_payload(&self, value: StatValue) -> Self {
        match self {
            ModifierKind::Setter { .. } => ModifierKind::Setter { value },
            ModifierKind::Flat { .. } => ModifierKind::Flat { value },
            ModifierKind::Clamp { is_buff, .. } => ModifierKind::Clamp {
                value,
                is_buff: *is_buff,
            },
            p @ ModifierKind::Percentage { .. } => p.clone(),
        }
    }
}

impl fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierKind::Setter { value } => write!(f, "set {}", value),
            ModifierKind::Flat { value } => write!(f, "flat {}", Signed(value)),
            ModifierKind::Percentage { percent } => write!(f, "{:+}%", percent),
            ModifierKind::Clamp {
                value,
                is_buff: true,
            } => write!(f, "floor {}", value),
            ModifierKind::Clamp {
                value,
                is_buff: false,
            } => write!(f, "ceiling {}", value),
        }
    }
}

struct Signed<'a>(&'a StatValue);

impl fmt::Display for Signed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            StatValue::Int(v) => write!(f, "{:+}", v),
            StatValue::Float(v) => write!(f, "{:+}", v),
            StatValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// A modifier tagged with the source that applied it.
///
/// The source is used for bulk removal, for instance when a status effect
/// expires.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Modifier, ModifierPhase};
///
/// let m = Modifier::percentage(50, "rage");
/// assert_eq!(m.phase(), ModifierPhase::Percentage);
/// assert_eq!(m.source, "rage");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub source: String,
}

impl Modifier {
    pub fn new(kind: ModifierKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn setter(value: impl Into<StatValue>, source: impl Into<String>) -> Self {
        Self::new(
            ModifierKind::Setter {
                value: value.into(),
            },
            source,
        )
    }

    pub fn flat(value: impl Into<StatValue>, source: impl Into<String>) -> Self {
        Self::new(
            ModifierKind::Flat {
                value: value.into(),
            },
            source,
        )
    }

    pub fn percentage(percent: i32, source: impl Into<String>) -> Self {
        Self::new(ModifierKind::Percentage { percent }, source)
    }

    /// A buff clamp: the value is raised to at least `value`.
    pub fn clamp_floor(value: impl Into<StatValue>, source: impl Into<String>) -> Self {
        Self::new(
            ModifierKind::Clamp {
                value: value.into(),
                is_buff: true,
            },
            source,
        )
    }

    /// A debuff clamp: the value is lowered to at most `value`.
    pub fn clamp_ceiling(value: impl Into<StatValue>, source: impl Into<String>) -> Self {
        Self::new(
            ModifierKind::Clamp {
                value: value.into(),
                is_buff: false,
            },
            source,
        )
    }

    pub fn phase(&self) -> ModifierPhase {
        self.kind.phase()
    }
}

/// Which modifier kinds a set accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierStrategy {
    /// Only setters; for value kinds without arithmetic.
    SetterOnly,
    /// Setter, flat, percentage and clamp.
    Numeric,
}

impl ModifierStrategy {
    pub fn accepts(self, phase: ModifierPhase) -> bool {
        match self {
            ModifierStrategy::SetterOnly => phase == ModifierPhase::Setter,
            ModifierStrategy::Numeric => true,
        }
    }
}

/// Identifies one modifier instance inside a [`ModifierSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModifierHandle(u64);

/// One recorded step of the pipeline, used by stat breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub phase: ModifierPhase,
    pub description: String,
    pub value: StatValue,
}

/// An ordered collection of modifiers for one stat.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Modifier, ModifierSet, StatValue, ValueKind};
///
/// let mut set = ModifierSet::for_kind(ValueKind::Int);
/// set.add(Modifier::flat(5, "sword")).unwrap();
/// let rage = set.add(Modifier::percentage(100, "rage")).unwrap();
///
/// assert_eq!(set.apply(StatValue::Int(10)), StatValue::Int(30));
/// set.remove(rage);
/// assert_eq!(set.apply(StatValue::Int(10)), StatValue::Int(15));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModifierSet {
    value_kind: ValueKind,
    strategy: ModifierStrategy,
    entries: Vec<(ModifierHandle, Modifier)>,
    next_handle: u64,
}

impl ModifierSet {
    /// Create the modifier set for a declared value kind.
    ///
    /// Booleans get the setter-only strategy, integers and floats the
    /// numeric one.
    pub fn for_kind(value_kind: ValueKind) -> Self {
        let strategy = if value_kind.is_numeric() {
            ModifierStrategy::Numeric
        } else {
            ModifierStrategy::SetterOnly
        };
        Self {
            value_kind,
            strategy,
            entries: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    pub fn strategy(&self) -> ModifierStrategy {
        self.strategy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate modifiers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ModifierHandle, &Modifier)> {
        self.entries.iter().map(|(h, m)| (*h, m))
    }

    /// Add a modifier.
    ///
    /// # Errors
    ///
    /// - `UnsupportedModifier` if the strategy does not accept the kind.
    /// - `ValueKindMismatch` if the payload cannot be expressed in the set's
    ///   value kind.
    pub fn add(&mut self, modifier: Modifier) -> Result<ModifierHandle, CombatError> {
        let phase = modifier.phase();
        if !self.strategy.accepts(phase) {
            return Err(CombatError::UnsupportedModifier {
                phase,
                strategy: self.strategy,
            });
        }
        let modifier = match modifier.kind.payload() {
            Some(value) => Modifier {
                kind: modifier.kind.with_payload(value.coerce(self.value_kind)?),
                source: modifier.source,
            },
            None => modifier,
        };

        let handle = ModifierHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push((handle, modifier));
        Ok(handle)
    }

    /// Remove one modifier instance. Returns it if it was present.
    pub fn remove(&mut self, handle: ModifierHandle) -> Option<Modifier> {
        let index = self.entries.iter().position(|(h, _)| *h == handle)?;
        Some(self.entries.remove(index).1)
    }

    /// Remove every modifier applied by `source`. Returns how many went.
    pub fn remove_all_from(&mut self, source: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, m)| m.source != source);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Run the pipeline against `base`.
    pub fn apply(&self, base: StatValue) -> StatValue {
        self.run(base, |_| {})
    }

    /// Run the pipeline and record each modifier that took part.
    pub fn apply_traced(&self, base: StatValue) -> (StatValue, Vec<PipelineStep>) {
        let mut steps = Vec::new();
        let value = self.run(base, |step| steps.push(step));
        (value, steps)
    }

    fn in_phase(&self, phase: ModifierPhase) -> impl Iterator<Item = &Modifier> {
        self.entries
            .iter()
            .map(|(_, m)| m)
            .filter(move |m| m.phase() == phase)
    }

    fn run(&self, base: StatValue, mut record: impl FnMut(PipelineStep)) -> StatValue {
        let mut step = |phase, m: &Modifier, value| {
            record(PipelineStep {
                phase,
                description: format!("{} ({})", m.kind, m.source),
                value,
            })
        };

        let mut value = base;

        let winner = match self.strategy {
            ModifierStrategy::SetterOnly => self.in_phase(ModifierPhase::Setter).last(),
            ModifierStrategy::Numeric => self
                .in_phase(ModifierPhase::Setter)
                .fold(None::<&Modifier>, |best, m| match best {
                    Some(b) if payload(b).max_of(payload(m)) == payload(b) => Some(b),
                    _ => Some(m),
                }),
        };
        if let Some(m) = winner {
            value = payload(m);
            step(ModifierPhase::Setter, m, value);
        }

        if self.strategy == ModifierStrategy::SetterOnly {
            return value;
        }

        for m in self.in_phase(ModifierPhase::Flat) {
            value = value.checked_add(payload(m)).unwrap_or(value);
            step(ModifierPhase::Flat, m, value);
        }

        for m in self.in_phase(ModifierPhase::Percentage) {
            if let ModifierKind::Percentage { percent } = m.kind {
                value = value.apply_percent(percent);
                step(ModifierPhase::Percentage, m, value);
            }
        }

        let floor = self
            .in_phase(ModifierPhase::ClampFloor)
            .fold(None::<&Modifier>, |best, m| match best {
                Some(b) if payload(b).max_of(payload(m)) == payload(b) => Some(b),
                _ => Some(m),
            });
        if let Some(m) = floor {
            value = value.max_of(payload(m));
            step(ModifierPhase::ClampFloor, m, value);
        }

        let ceiling = self
            .in_phase(ModifierPhase::ClampCeiling)
            .fold(None::<&Modifier>, |best, m| match best {
                Some(b) if payload(b).min_of(payload(m)) == payload(b) => Some(b),
                _ => Some(m),
            });
        if let Some(m) = ceiling {
            value = value.min_of(payload(m));
            step(ModifierPhase::ClampCeiling, m, value);
        }

        value
    }
}

fn payload(m: &Modifier) -> StatValue {
    m.kind.payload().unwrap_or(StatValue::Int(0))
}
