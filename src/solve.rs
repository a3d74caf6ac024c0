use crate::algebra::{
    split_equation, Key, ParseError, ParseMode, Terms, ANSWER_TOLERANCE,
    TIGHT_TOLERANCE,
};
use approx::AbsDiffEq;
use log::warn;
use std::fmt::{self, Display, Formatter};

/// The answer to a linear equation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Solution {
    Unique(f64),
    /// Both sides are the same, so every value works.
    Infinite,
    /// The variable cancels out and leaves a contradiction, e.g. `5 = -1`.
    Unsolvable,
}

impl Solution {
    /// Would a learner's `answer` be marked as correct?
    pub fn accepts(&self, answer: f64) -> bool {
        match self {
            Solution::Unique(value) => {
                answer.abs_diff_eq(value, ANSWER_TOLERANCE)
            },
            Solution::Infinite => true,
            Solution::Unsolvable => false,
        }
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Solution::Unique(value) => write!(f, "{}", value),
            Solution::Infinite => write!(f, "infinitely many solutions"),
            Solution::Unsolvable => write!(f, "no solution"),
        }
    }
}

/// Find the value of `target` which satisfies an equation in one variable,
/// skipping any malformed terms.
pub fn solve(equation: &str, target: &str) -> Result<Solution, ParseError> {
    solve_with(equation, target, ParseMode::Lenient)
}

/// Solve a linear equation in one variable by rearranging it into the form
/// `A*x = B`.
///
/// The equation is assumed to contain no other variables. Any that do turn
/// up are treated as though they were part of the constant.
///
/// The result is rounded to 6 decimal places to hide floating point noise.
pub fn solve_with(
    equation: &str,
    target: &str,
    mode: ParseMode,
) -> Result<Solution, ParseError> {
    let (left, right) = split_equation(equation)?;
    let right_offset = left.len() + 1;
    let left = LinearForm::extract(left, 0, target, mode)?;
    let right = LinearForm::extract(right, right_offset, target, mode)?;

    let a = left.coefficient - right.coefficient;
    let b = right.constant - left.constant;

    if a.abs_diff_eq(&0.0, TIGHT_TOLERANCE) {
        if b.abs_diff_eq(&0.0, TIGHT_TOLERANCE) {
            Ok(Solution::Infinite)
        } else {
            Ok(Solution::Unsolvable)
        }
    } else {
        Ok(Solution::Unique(round_to_micros(b / a)))
    }
}

fn round_to_micros(value: f64) -> f64 {
    const SCALE: f64 = 1e6;
    // adding zero turns -0 into 0
    (value * SCALE).round() / SCALE + 0.0
}

/// One side of an equation reduced to `coefficient*target + constant`.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
struct LinearForm {
    coefficient: f64,
    constant: f64,
}

impl LinearForm {
    fn extract(
        src: &str,
        offset: usize,
        target: &str,
        mode: ParseMode,
    ) -> Result<Self, ParseError> {
        let mut form = LinearForm::default();
        let mut seen = 0;

        for result in Terms::new(src, offset, mode) {
            let term = match result {
                Ok(term) => term,
                Err(e) if mode == ParseMode::Lenient => {
                    warn!("Skipping malformed term in \"{}\": {}", src.trim(), e);
                    continue;
                },
                Err(e) => return Err(e),
            };
            seen += 1;

            match term.key {
                Key::Variable(ref name) if name.as_str() == target => {
                    form.coefficient += term.coefficient
                },
                Key::Variable(ref name) => {
                    warn!(
                        "Treating \"{}\" as a constant while solving for \"{}\"",
                        name, target
                    );
                    form.constant += term.coefficient;
                },
                Key::Constant => form.constant += term.coefficient,
            }
        }

        if seen == 0 && mode == ParseMode::Strict {
            return Err(ParseError::UnexpectedEndOfInput);
        }

        Ok(form)
    }
}
