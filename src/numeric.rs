//! Numeric types for stat values.
//!
//! Stats are declared with a closed [`ValueKind`]. The matching
//! [`StatValue`] carries the payload, and the arithmetic the modifier
//! pipeline needs is defined per kind here. Integer percentage math
//! truncates toward zero, so `10 * (1 + 15/100)` yields `11`.

use crate::error::CombatError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Declared value type of a stat.
///
/// The kind selects the modifier strategy once at stat construction
/// (see [`ModifierSet::for_kind`](crate::ModifierSet::for_kind)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Float,
    Bool,
}

impl ValueKind {
    /// Whether values of this kind support flat, percentage and clamp math.
    pub fn is_numeric(self) -> bool {
        !matches!(self, ValueKind::Bool)
    }
}

/// A stat value of one of the supported kinds.
///
/// Serialized as a bare JSON value: `true`, `12` or `1.5`.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{StatValue, ValueKind};
///
/// let v = StatValue::Int(10);
/// assert_eq!(v.kind(), ValueKind::Int);
/// assert_eq!(v.apply_percent(50), StatValue::Int(15));
/// assert_eq!(StatValue::Float(2.0).apply_percent(-25), StatValue::Float(1.5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Bool(bool),
    Int(i32),
    Float(f64),
}

impl StatValue {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            StatValue::Bool(_) => ValueKind::Bool,
            StatValue::Int(_) => ValueKind::Int,
            StatValue::Float(_) => ValueKind::Float,
        }
    }

    /// The neutral value of a kind (`false`, `0`, `0.0`).
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => StatValue::Bool(false),
            ValueKind::Int => StatValue::Int(0),
            ValueKind::Float => StatValue::Float(0.0),
        }
    }

    /// Fail with `ValueKindMismatch` unless this value is of `kind`.
    pub fn expect_kind(&self, kind: ValueKind) -> Result<(), CombatError> {
        if self.kind() == kind {
            Ok(())
        } else {
            Err(CombatError::ValueKindMismatch {
                expected: kind,
                found: self.kind(),
            })
        }
    }

    /// Convert into `kind` where that is lossless.
    ///
    /// Integers widen to floats, which lets definition files write `10`
    /// for a float stat. Every other cross-kind conversion is rejected.
    pub fn coerce(self, kind: ValueKind) -> Result<Self, CombatError> {
        match (self, kind) {
            (StatValue::Int(i), ValueKind::Float) => Ok(StatValue::Float(i as f64)),
            (v, k) => {
                v.expect_kind(k)?;
                Ok(v)
            }
        }
    }

    /// Sum of two values of the same numeric kind.
    ///
    /// Integer addition saturates. Booleans cannot be added.
    pub fn checked_add(self, other: StatValue) -> Result<Self, CombatError> {
        match (self, other) {
            (StatValue::Int(a), StatValue::Int(b)) => Ok(StatValue::Int(a.saturating_add(b))),
            (StatValue::Float(a), StatValue::Float(b)) => Ok(StatValue::Float(a + b)),
            (a, b) => Err(CombatError::ValueKindMismatch {
                expected: a.kind(),
                found: b.kind(),
            }),
        }
    }

    /// Scale by `1 + percent / 100`.
    ///
    /// Integers truncate toward zero. Booleans are returned unchanged.
    pub fn apply_percent(self, percent: i32) -> Self {
        let factor = 1.0 + percent as f64 / 100.0;
        match self {
            StatValue::Int(v) => StatValue::Int((v as f64 * factor) as i32),
            StatValue::Float(v) => StatValue::Float(v * factor),
            b @ StatValue::Bool(_) => b,
        }
    }

    /// Compare two values of the same kind.
    ///
    /// Returns `None` across kinds or when a float is NaN.
    pub fn compare(&self, other: &StatValue) -> Option<Ordering> {
        match (self, other) {
            (StatValue::Bool(a), StatValue::Bool(b)) => Some(a.cmp(b)),
            (StatValue::Int(a), StatValue::Int(b)) => Some(a.cmp(b)),
            (StatValue::Float(a), StatValue::Float(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// The larger of two values, keeping `self` when they are incomparable.
    pub fn max_of(self, other: StatValue) -> Self {
        match self.compare(&other) {
            Some(Ordering::Less) => other,
            _ => self,
        }
    }

    /// The smaller of two values, keeping `self` when they are incomparable.
    pub fn min_of(self, other: StatValue) -> Self {
        match self.compare(&other) {
            Some(Ordering::Greater) => other,
            _ => self,
        }
    }

    /// Clamp into `[min, max]`.
    pub fn clamp_to(self, min: StatValue, max: StatValue) -> Self {
        self.max_of(min).min_of(max)
    }

    /// Integer view. Floats truncate; booleans have none.
    pub fn to_i32(&self) -> Option<i32> {
        match self {
            StatValue::Int(v) => Some(*v),
            StatValue::Float(v) => Some(*v as i32),
            StatValue::Bool(_) => None,
        }
    }

    /// Floating-point view. Booleans have none.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            StatValue::Int(v) => Some(*v as f64),
            StatValue::Float(v) => Some(*v),
            StatValue::Bool(_) => None,
        }
    }
}

impl From<i32> for StatValue {
    fn from(v: i32) -> Self {
        StatValue::Int(v)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<bool> for StatValue {
    fn from(v: bool) -> Self {
        StatValue::Bool(v)
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Bool(v) => write!(f, "{}", v),
            StatValue::Int(v) => write!(f, "{}", v),
            StatValue::Float(v) => write!(f, "{}", v),
        }
    }
}
