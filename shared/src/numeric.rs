//! Tagged numeric value used by every condition test.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A value read from RAM or written in a formula.
///
/// Integer arithmetic wraps. Mixing an integer with a float promotes both to f64.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Numeric {
    Integer(i64),
    Float(f64),
}

impl Numeric {
    pub const ZERO: Numeric = Numeric::Integer(0);

    pub fn is_float(&self) -> bool {
        matches!(self, Numeric::Float(_))
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Numeric::Integer(v) => v as f64,
            Numeric::Float(v) => v,
        }
    }

    /// Integer view; floats truncate toward zero (NaN becomes 0).
    pub fn as_i64(&self) -> i64 {
        match *self {
            Numeric::Integer(v) => v,
            Numeric::Float(v) => v as i64,
        }
    }

    /// Total order over values.
    ///
    /// If either side is a float both are compared as f64, with NaN sorting
    /// below every other value and equal to itself. Otherwise compares as i64.
    pub fn compare(&self, other: &Numeric) -> Ordering {
        match (*self, *other) {
            (Numeric::Integer(a), Numeric::Integer(b)) => a.cmp(&b),
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                match (a.is_nan(), b.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                }
            }
        }
    }
}

impl Default for Numeric {
    fn default() -> Self {
        Numeric::ZERO
    }
}

impl From<i64> for Numeric {
    fn from(v: i64) -> Self {
        Numeric::Integer(v)
    }
}

impl From<f64> for Numeric {
    fn from(v: f64) -> Self {
        Numeric::Float(v)
    }
}

impl Add for Numeric {
    type Output = Numeric;

    fn add(self, rhs: Numeric) -> Numeric {
        match (self, rhs) {
            (Numeric::Integer(a), Numeric::Integer(b)) => Numeric::Integer(a.wrapping_add(b)),
            (a, b) => Numeric::Float(a.as_f64() + b.as_f64()),
        }
    }
}

impl Sub for Numeric {
    type Output = Numeric;

    fn sub(self, rhs: Numeric) -> Numeric {
        match (self, rhs) {
            (Numeric::Integer(a), Numeric::Integer(b)) => Numeric::Integer(a.wrapping_sub(b)),
            (a, b) => Numeric::Float(a.as_f64() - b.as_f64()),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Integer(v) => write!(f, "{}", v),
            Numeric::Float(v) => write!(f, "{}", v),
        }
    }
}
