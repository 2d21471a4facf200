//! Latch initial values and the consensus algebra used by retiming moves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, Not};

/// The initial value carried by a single latch.
///
/// - `Zero` / `One`: a required concrete reset value
/// - `DontCare`: unconstrained, compatible with either concrete value
/// - `Unknown`: pending resolution by backward-retiming legalization
///
/// In simulation `DontCare` plays the role of the unknown `X` value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitValue {
    /// Logic low.
    Zero,
    /// Logic high.
    One,
    /// Unconstrained.
    #[default]
    DontCare,
    /// Pending legalization.
    Unknown,
}

impl InitValue {
    /// Converts a boolean into a concrete value.
    pub fn from_bool(value: bool) -> Self {
        if value {
            InitValue::One
        } else {
            InitValue::Zero
        }
    }

    /// Returns the concrete boolean, or `None` for `DontCare` and `Unknown`.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            InitValue::Zero => Some(false),
            InitValue::One => Some(true),
            InitValue::DontCare | InitValue::Unknown => None,
        }
    }

    /// Returns `true` for `Zero` and `One`.
    pub fn is_concrete(self) -> bool {
        self.to_bool().is_some()
    }

    /// Applies an edge complementation bit.
    pub fn complement_if(self, complement: bool) -> Self {
        if complement {
            !self
        } else {
            self
        }
    }

    /// Merges two requirements placed on one physical latch.
    ///
    /// `DontCare` yields to the other side, equal values merge to themselves,
    /// and `0`/`1` conflict. `Unknown` never merges.
    pub fn merge(self, other: Self) -> Option<Self> {
        use InitValue::*;
        match (self, other) {
            (Unknown, _) | (_, Unknown) => None,
            (DontCare, v) | (v, DontCare) => Some(v),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }

    /// Returns `true` if an observer expecting `self` accepts `observed`.
    ///
    /// A `DontCare` expectation accepts anything; a concrete expectation
    /// accepts only the same concrete value.
    pub fn admits(self, observed: Self) -> bool {
        match self.to_bool() {
            None => true,
            Some(b) => observed.to_bool() == Some(b),
        }
    }

    /// Parses `0`, `1`, `x`/`-` (don't-care) and `?` (unknown).
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(InitValue::Zero),
            '1' => Some(InitValue::One),
            'x' | 'X' | '-' => Some(InitValue::DontCare),
            '?' => Some(InitValue::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for InitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitValue::Zero => write!(f, "0"),
            InitValue::One => write!(f, "1"),
            InitValue::DontCare => write!(f, "x"),
            InitValue::Unknown => write!(f, "?"),
        }
    }
}

/// AND-consensus:
/// ```text
///     0  1  x  ?
/// 0 | 0  0  0  0
/// 1 | 0  1  x  ?
/// x | 0  x  x  ?
/// ? | 0  ?  ?  ?
/// ```
impl BitAnd for InitValue {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use InitValue::*;
        match (self, rhs) {
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            (Unknown, _) | (_, Unknown) => Unknown,
            _ => DontCare,
        }
    }
}

/// `!0 = 1`, `!1 = 0`, `!x = x`, `!? = ?`.
impl Not for InitValue {
    type Output = Self;

    fn not(self) -> Self {
        use InitValue::*;
        match self {
            Zero => One,
            One => Zero,
            other => other,
        }
    }
}
