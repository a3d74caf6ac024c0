use crate::algebra::{
    ops::{self, Operation, OperationError},
    parse_equation, parse_equation_with, Key, ParseError, ParseMode, TermMap,
    TIGHT_TOLERANCE,
};
use approx::AbsDiffEq;
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// A pair of sides which are meant to be equal.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Equation {
    pub left: TermMap,
    pub right: TermMap,
}

impl Equation {
    pub fn new(left: TermMap, right: TermMap) -> Self {
        Equation { left, right }
    }

    pub fn parse_with(s: &str, mode: ParseMode) -> Result<Self, ParseError> {
        let (left, right) = parse_equation_with(s, mode)?;
        Ok(Equation::new(left, right))
    }

    /// Apply an [`Operation`] to both sides, leaving `self` untouched.
    pub fn apply(&self, operation: &Operation) -> Result<Self, OperationError> {
        let (left, right) =
            ops::apply_to_both_sides(&self.left, &self.right, operation)?;
        Ok(Equation::new(left, right))
    }

    /// Is this equation in the form `target = c` or `c = target`?
    pub fn is_solved_for(&self, target: &str) -> bool {
        is_solved_form(&self.left, &self.right, target)
    }
}

impl FromStr for Equation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (left, right) = parse_equation(s)?;
        Ok(Equation::new(left, right))
    }
}

impl Display for Equation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// Check whether one side is exactly `{target: 1}` and the other is a lone
/// constant.
///
/// This only looks at the shape of the equation. `2x = 6` has the right
/// solution but isn't solved yet, and nothing checks that the constant is
/// the true solution.
pub fn is_solved_form(left: &TermMap, right: &TermMap, target: &str) -> bool {
    let target = Key::variable(target);

    (is_isolated(left, &target) && is_lone_constant(right))
        || (is_isolated(right, &target) && is_lone_constant(left))
}

fn is_isolated(side: &TermMap, target: &Key) -> bool {
    side.len() == 1
        && side.contains(target)
        && side.coefficient(target).abs_diff_eq(&1.0, TIGHT_TOLERANCE)
}

fn is_lone_constant(side: &TermMap) -> bool {
    side.len() == 1 && side.contains(&Key::Constant)
}
