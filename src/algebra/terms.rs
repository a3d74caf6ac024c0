//! The canonical form of one side of an equation.

use approx::AbsDiffEq;
use smol_str::SmolStr;
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    iter::FromIterator,
};

/// Coefficients closer than this are treated as equal by the engine's own
/// bookkeeping (pruning zero terms, checking for solved form).
pub const TIGHT_TOLERANCE: f64 = 1e-9;

/// The slack given to a number typed in by a learner.
pub const ANSWER_TOLERANCE: f64 = 1e-6;

/// What a coefficient in a [`TermMap`] is attached to.
///
/// Variables sort before the constant, so iterating over a [`TermMap`]
/// yields its variables in name order followed by the constant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Variable(SmolStr),
    /// The reserved key for the non-variable part of a side.
    Constant,
}

impl Key {
    pub fn variable<S: AsRef<str>>(name: S) -> Self {
        Key::Variable(SmolStr::new(name.as_ref()))
    }

    pub fn is_constant(&self) -> bool { *self == Key::Constant }

    /// The variable's name, or `None` for the constant.
    pub fn name(&self) -> Option<&str> {
        match self {
            Key::Variable(name) => Some(name.as_str()),
            Key::Constant => None,
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Key::Variable(name) => write!(f, "{}", name),
            Key::Constant => write!(f, "constant"),
        }
    }
}

/// A mapping from [`Key`] to coefficient, e.g. `2x + 3` is `{x: 2,
/// constant: 3}`.
///
/// A term map is always normalized: no coefficient is within
/// [`TIGHT_TOLERANCE`] of zero, and a side with nothing on it is
/// `{constant: 0}` rather than empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMap {
    terms: BTreeMap<Key, f64>,
}

impl TermMap {
    /// The side `0`.
    pub fn zero() -> Self { TermMap::constant(0.0) }

    /// A side containing only a constant.
    pub fn constant(value: f64) -> Self {
        let mut map = TermMap {
            terms: BTreeMap::new(),
        };
        map.accumulate(Key::Constant, value);
        map.normalize();
        map
    }

    /// The coefficient attached to `key`, with absent keys reading as `0`.
    pub fn coefficient(&self, key: &Key) -> f64 {
        self.terms.get(key).copied().unwrap_or(0.0)
    }

    pub fn constant_term(&self) -> f64 { self.coefficient(&Key::Constant) }

    pub fn contains(&self, key: &Key) -> bool { self.terms.contains_key(key) }

    pub fn len(&self) -> usize { self.terms.len() }

    /// Is this side `0`?
    pub fn is_zero(&self) -> bool {
        self.terms.len() == 1 && self.constant_term() == 0.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, f64)> + '_ {
        self.terms.iter().map(|(key, value)| (key, *value))
    }

    /// The names of every variable on this side, in sorted order.
    pub fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms.keys().filter_map(Key::name)
    }

    /// Add `coefficient` to whatever is already stored under `key`.
    ///
    /// The map may be left un-normalized, callers must finish with
    /// [`TermMap::normalize()`].
    pub(crate) fn accumulate(&mut self, key: Key, coefficient: f64) {
        *self.terms.entry(key).or_insert(0.0) += coefficient;
    }

    /// Are all the coefficients finite?
    pub fn is_finite(&self) -> bool {
        self.terms.values().all(|value| value.is_finite())
    }

    /// Apply `func` to every coefficient.
    pub(crate) fn map_coefficients<F>(&mut self, mut func: F)
    where
        F: FnMut(f64) -> f64,
    {
        for value in self.terms.values_mut() {
            *value = func(*value);
        }
    }

    /// Drop near-zero coefficients, making sure the map never ends up empty.
    pub(crate) fn normalize(&mut self) {
        self.terms
            .retain(|_, value| !(*value).abs_diff_eq(&0.0, TIGHT_TOLERANCE));

        if self.terms.is_empty() {
            self.terms.insert(Key::Constant, 0.0);
        }
    }

    /// Calculate the numeric value of this side when each variable is given
    /// the value returned by `lookup`.
    ///
    /// Returns `None` if `lookup` doesn't know about one of the variables.
    pub fn evaluate<F>(&self, lookup: F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut total = 0.0;

        for (key, coefficient) in self.iter() {
            let value = match key {
                Key::Variable(name) => lookup(name)?,
                Key::Constant => 1.0,
            };
            total += coefficient * value;
        }

        Some(total)
    }

    /// Compare two maps key-by-key, treating coefficients within `epsilon`
    /// of each other as equal.
    pub fn approx_eq(&self, other: &TermMap, epsilon: f64) -> bool {
        self.terms
            .keys()
            .chain(other.terms.keys())
            .all(|key| {
                self.coefficient(key)
                    .abs_diff_eq(&other.coefficient(key), epsilon)
            })
    }
}

impl Default for TermMap {
    fn default() -> Self { TermMap::zero() }
}

impl FromIterator<(Key, f64)> for TermMap {
    /// Sum up a sequence of terms, combining repeated keys.
    fn from_iter<T: IntoIterator<Item = (Key, f64)>>(iter: T) -> Self {
        let mut map = TermMap {
            terms: BTreeMap::new(),
        };

        for (key, coefficient) in iter {
            map.accumulate(key, coefficient);
        }

        map.normalize();
        map
    }
}

/// Render a side for display, e.g. `{x: -1, y: 2, constant: -3}` becomes
/// `"-x + 2y - 3"`.
///
/// Re-parsing the result gives back an equivalent [`TermMap`], although not
/// necessarily the same text the side was originally parsed from.
pub fn format_side(side: &TermMap) -> String { side.to_string() }

impl Display for TermMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;

        for (key, coefficient) in self.iter() {
            let name = match key {
                Key::Variable(name) => name,
                Key::Constant => continue,
            };

            write_sign(f, coefficient, first)?;
            let magnitude = coefficient.abs();
            if magnitude != 1.0 {
                write!(f, "{}", magnitude)?;
            }
            write!(f, "{}", name)?;

            first = false;
        }

        let constant = self.constant_term();

        if first {
            write!(f, "{}", constant)
        } else if constant != 0.0 {
            write_sign(f, constant, false)?;
            write!(f, "{}", constant.abs())
        } else {
            Ok(())
        }
    }
}

fn write_sign(
    f: &mut Formatter<'_>,
    coefficient: f64,
    first: bool,
) -> fmt::Result {
    match (first, coefficient < 0.0) {
        (true, false) => Ok(()),
        (true, true) => write!(f, "-"),
        (false, false) => write!(f, " + "),
        (false, true) => write!(f, " - "),
    }
}
