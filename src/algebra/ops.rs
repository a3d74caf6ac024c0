//! Operations which are applied to both sides of an equation at once.

use crate::algebra::{parse_term, Key, ParseError, TermMap};
use log::debug;
use smol_str::SmolStr;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// Something a learner can do to both sides of an equation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Add a number to the constant term.
    Add(f64),
    /// Subtract a number from the constant term.
    Subtract(f64),
    /// Multiply every coefficient by a non-zero number.
    Multiply(f64),
    /// Divide every coefficient by a non-zero number.
    Divide(f64),
    AddVariable(VariableTerm),
    SubtractVariable(VariableTerm),
}

impl Operation {
    /// Check the operand is something we can apply to an equation.
    pub fn validate(&self) -> Result<(), OperationError> {
        match self {
            Operation::Add(value) | Operation::Subtract(value) => {
                check_finite(*value)
            },
            Operation::Multiply(value) => {
                check_finite(*value)?;
                if *value == 0.0 {
                    return Err(OperationError::MultiplyByZero);
                }
                Ok(())
            },
            Operation::Divide(value) => {
                check_finite(*value)?;
                if *value == 0.0 {
                    return Err(OperationError::DivideByZero);
                }
                Ok(())
            },
            Operation::AddVariable(term) | Operation::SubtractVariable(term) => {
                term.validate()
            },
        }
    }

    /// A past-tense description of the operation, suitable for showing to
    /// the learner after it has been applied.
    pub fn describe(&self) -> String {
        match self {
            Operation::Add(value) => format!("Added {} to both sides.", value),
            Operation::Subtract(value) => {
                format!("Subtracted {} from both sides.", value)
            },
            Operation::Multiply(value) => {
                format!("Multiplied both sides by {}.", value)
            },
            Operation::Divide(value) => {
                format!("Divided both sides by {}.", value)
            },
            Operation::AddVariable(term) => {
                format!("Added {} to both sides.", term)
            },
            Operation::SubtractVariable(term) => {
                format!("Subtracted {} from both sides.", term)
            },
        }
    }

    /// Apply an already validated operation to one side.
    fn apply(&self, side: &TermMap) -> TermMap {
        let mut side = side.clone();

        match self {
            Operation::Add(value) => side.accumulate(Key::Constant, *value),
            Operation::Subtract(value) => {
                side.accumulate(Key::Constant, -value)
            },
            Operation::Multiply(value) => side.map_coefficients(|c| c * value),
            Operation::Divide(value) => side.map_coefficients(|c| c / value),
            Operation::AddVariable(term) => {
                side.accumulate(term.key(), term.coefficient)
            },
            Operation::SubtractVariable(term) => {
                side.accumulate(term.key(), -term.coefficient)
            },
        }

        side.normalize();
        side
    }
}

/// Apply an [`Operation`] to both sides of an equation, returning the new
/// sides.
///
/// The original sides are never touched, so on error the caller still has
/// the equation exactly as it was.
pub fn apply_to_both_sides(
    left: &TermMap,
    right: &TermMap,
    operation: &Operation,
) -> Result<(TermMap, TermMap), OperationError> {
    operation.validate()?;

    let new_left = operation.apply(left);
    let new_right = operation.apply(right);

    if !new_left.is_finite() || !new_right.is_finite() {
        debug!("{}: {} = {} overflowed", operation, left, right);
        return Err(OperationError::Overflow);
    }

    debug!(
        "{}: {} = {} became {} = {}",
        operation, left, right, new_left, new_right
    );

    Ok((new_left, new_right))
}

fn check_finite(value: f64) -> Result<(), OperationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(OperationError::NonFiniteOperand)
    }
}

/// The operand for [`Operation::AddVariable`] and
/// [`Operation::SubtractVariable`], e.g. `2x`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableTerm {
    pub coefficient: f64,
    pub name: SmolStr,
}

impl VariableTerm {
    pub fn new<S: AsRef<str>>(coefficient: f64, name: S) -> Self {
        VariableTerm {
            coefficient,
            name: SmolStr::new(name.as_ref()),
        }
    }

    pub fn key(&self) -> Key { Key::Variable(self.name.clone()) }

    fn validate(&self) -> Result<(), OperationError> {
        check_finite(self.coefficient)?;

        if !is_valid_name(&self.name) {
            return Err(OperationError::InvalidVariable {
                name: self.name.clone(),
            });
        }
        if self.coefficient == 0.0 {
            return Err(OperationError::ZeroCoefficient);
        }

        Ok(())
    }
}

/// Variables are a single letter, the same as the equation grammar.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match (chars.next(), chars.next()) {
        (Some(letter), None) => letter.is_ascii_alphabetic(),
        _ => false,
    }
}

impl Display for VariableTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.coefficient == 1.0 {
            write!(f, "{}", self.name)
        } else if self.coefficient == -1.0 {
            write!(f, "-{}", self.name)
        } else {
            write!(f, "{}{}", self.coefficient, self.name)
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add(value) => write!(f, "add {}", value),
            Operation::Subtract(value) => write!(f, "subtract {}", value),
            Operation::Multiply(value) => write!(f, "multiply {}", value),
            Operation::Divide(value) => write!(f, "divide {}", value),
            Operation::AddVariable(term) => write!(f, "add {}", term),
            Operation::SubtractVariable(term) => {
                write!(f, "subtract {}", term)
            },
        }
    }
}

impl FromStr for Operation {
    type Err = ParseOperationError;

    /// Parse commands like `"add 3"`, `"sub 2x"`, `"mul -1"` or
    /// `"divide by 4"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, operand) = match s.find(char::is_whitespace) {
            Some(index) => (&s[..index], s[index..].trim()),
            None => (s, ""),
        };
        let operand = operand.strip_prefix("by ").unwrap_or(operand).trim();

        if operand.is_empty() {
            return Err(ParseOperationError::MissingOperand);
        }

        let term = parse_term(operand)?;

        match (verb.to_ascii_lowercase().as_str(), term.key) {
            ("add" | "+", Key::Constant) => Ok(Operation::Add(term.coefficient)),
            ("add" | "+", Key::Variable(name)) => {
                Ok(Operation::AddVariable(VariableTerm {
                    coefficient: term.coefficient,
                    name,
                }))
            },
            ("sub" | "subtract" | "-", Key::Constant) => {
                Ok(Operation::Subtract(term.coefficient))
            },
            ("sub" | "subtract" | "-", Key::Variable(name)) => {
                Ok(Operation::SubtractVariable(VariableTerm {
                    coefficient: term.coefficient,
                    name,
                }))
            },
            ("mul" | "multiply" | "times" | "*", Key::Constant) => {
                Ok(Operation::Multiply(term.coefficient))
            },
            ("div" | "divide" | "/", Key::Constant) => {
                Ok(Operation::Divide(term.coefficient))
            },
            ("mul" | "multiply" | "times" | "*" | "div" | "divide" | "/", _) => {
                Err(ParseOperationError::NeedsNumber)
            },
            (other, _) => Err(ParseOperationError::UnknownVerb(other.into())),
        }
    }
}

/// Reasons an [`Operation`] can't be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationError {
    MultiplyByZero,
    DivideByZero,
    /// The operand was `NaN` or infinite.
    NonFiniteOperand,
    /// Adding or subtracting `0x` doesn't do anything.
    ZeroCoefficient,
    InvalidVariable { name: SmolStr },
    /// A coefficient became too large to represent.
    Overflow,
}

impl Display for OperationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OperationError::MultiplyByZero => {
                write!(f, "Cannot multiply by zero.")
            },
            OperationError::DivideByZero => write!(f, "Cannot divide by zero."),
            OperationError::NonFiniteOperand => {
                write!(f, "The operand must be a finite number.")
            },
            OperationError::ZeroCoefficient => {
                write!(f, "A variable term needs a non-zero coefficient.")
            },
            OperationError::InvalidVariable { name } => {
                write!(f, "\"{}\" isn't a valid variable name.", name)
            },
            OperationError::Overflow => {
                write!(f, "The numbers got too big to work with.")
            },
        }
    }
}

impl Error for OperationError {}

/// Errors from parsing an [`Operation`] from text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOperationError {
    UnknownVerb(String),
    MissingOperand,
    /// Multiplying or dividing by a variable would make the equation
    /// non-linear.
    NeedsNumber,
    Operand(ParseError),
}

impl From<ParseError> for ParseOperationError {
    fn from(e: ParseError) -> Self { ParseOperationError::Operand(e) }
}

impl Display for ParseOperationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseOperationError::UnknownVerb(verb) => {
                write!(f, "Unknown operation, \"{}\"", verb)
            },
            ParseOperationError::MissingOperand => {
                write!(f, "The operation needs an operand")
            },
            ParseOperationError::NeedsNumber => {
                write!(f, "You can only multiply or divide by a number")
            },
            ParseOperationError::Operand(_) => {
                write!(f, "Unable to parse the operand")
            },
        }
    }
}

impl Error for ParseOperationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseOperationError::Operand(inner) => Some(inner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{parse_equation, parse_side, TIGHT_TOLERANCE};

    fn x() -> Key { Key::variable("x") }

    #[test]
    fn add_and_subtract_touch_the_constant() {
        let (left, right) = parse_equation("4x - 1 = 7").unwrap();

        let (left, right) =
            apply_to_both_sides(&left, &right, &Operation::Add(1.0)).unwrap();
        assert_eq!(left, parse_side("4x"));
        assert_eq!(right, parse_side("8"));

        let (left, right) =
            apply_to_both_sides(&left, &right, &Operation::Subtract(8.0))
                .unwrap();
        assert_eq!(left, parse_side("4x - 8"));
        assert_eq!(right, TermMap::zero());
    }

    #[test]
    fn multiply_and_divide_scale_everything() {
        let (left, right) = parse_equation("2x + 4 = 6 - y").unwrap();

        let (left, right) =
            apply_to_both_sides(&left, &right, &Operation::Divide(2.0))
                .unwrap();
        assert_eq!(left, parse_side("x + 2"));
        assert_eq!(right, parse_side("3 - 0.5y"));

        let (left, right) =
            apply_to_both_sides(&left, &right, &Operation::Multiply(-3.0))
                .unwrap();
        assert_eq!(left, parse_side("-3x - 6"));
        assert_eq!(right, parse_side("-9 + 1.5y"));
    }

    #[test]
    fn variable_terms_can_cancel() {
        let (left, right) = parse_equation("4x = 2x + 6").unwrap();
        let op = Operation::SubtractVariable(VariableTerm::new(2.0, "x"));

        let (left, right) = apply_to_both_sides(&left, &right, &op).unwrap();

        assert_eq!(left.coefficient(&x()), 2.0);
        assert!(!right.contains(&x()));
        assert_eq!(right, TermMap::constant(6.0));
    }

    #[test]
    fn adding_a_new_variable() {
        let (left, right) = parse_equation("x = 3").unwrap();
        let op = Operation::AddVariable(VariableTerm::new(-1.0, "y"));

        let (left, right) = apply_to_both_sides(&left, &right, &op).unwrap();

        assert_eq!(left, parse_side("x - y"));
        assert_eq!(right, parse_side("3 - y"));
    }

    #[test]
    fn coefficients_must_stay_finite() {
        let (left, right) = parse_equation("2x = 6").unwrap();
        let (left, right) =
            apply_to_both_sides(&left, &right, &Operation::Multiply(1e300))
                .unwrap();
        assert!(left.is_finite() && right.is_finite());
        let left_before = left.clone();
        let right_before = right.clone();

        let inputs = vec![
            Operation::Multiply(1e300),
            Operation::Divide(1e-300),
            Operation::Add(std::f64::MAX),
            Operation::AddVariable(VariableTerm::new(std::f64::MAX, "x")),
        ];

        for op in inputs {
            let got = apply_to_both_sides(&left, &right, &op);

            assert_eq!(got, Err(OperationError::Overflow), "{}", op);
            assert_eq!(left, left_before);
            assert_eq!(right, right_before);
        }
    }

    #[test]
    fn invalid_operands_leave_the_sides_untouched() {
        let (left, right) = parse_equation("2x + 1 = 7").unwrap();
        let left_before = left.clone();
        let right_before = right.clone();
        let inputs = vec![
            (Operation::Multiply(0.0), OperationError::MultiplyByZero),
            (Operation::Divide(0.0), OperationError::DivideByZero),
            (Operation::Divide(-0.0), OperationError::DivideByZero),
            (Operation::Add(std::f64::NAN), OperationError::NonFiniteOperand),
            (
                Operation::Multiply(std::f64::INFINITY),
                OperationError::NonFiniteOperand,
            ),
            (
                Operation::AddVariable(VariableTerm::new(0.0, "x")),
                OperationError::ZeroCoefficient,
            ),
            (
                Operation::SubtractVariable(VariableTerm::new(1.0, "")),
                OperationError::InvalidVariable { name: "".into() },
            ),
            (
                Operation::AddVariable(VariableTerm::new(1.0, "_constant")),
                OperationError::InvalidVariable {
                    name: "_constant".into(),
                },
            ),
            (
                Operation::AddVariable(VariableTerm::new(2.0, "ab")),
                OperationError::InvalidVariable { name: "ab".into() },
            ),
            (
                Operation::SubtractVariable(VariableTerm::new(1.0, "é")),
                OperationError::InvalidVariable { name: "é".into() },
            ),
        ];

        for (op, should_be) in inputs {
            let got = apply_to_both_sides(&left, &right, &op).unwrap_err();

            assert_eq!(got, should_be);
            assert_eq!(left, left_before);
            assert_eq!(right, right_before);
        }
    }

    #[test]
    fn operations_keep_both_sides_equal() {
        // each equation holds when x = 2 and y = -1
        let equations = vec![
            "4x - 1 = 7",
            "2x + 5y = -1",
            "x = -2x + 6 + y + 1",
            "0.5x + 1 = 2",
            "3 = x + 1",
            "x - y = 3",
        ];
        let operations = vec![
            Operation::Add(3.5),
            Operation::Subtract(-2.0),
            Operation::Multiply(-0.25),
            Operation::Divide(3.0),
            Operation::AddVariable(VariableTerm::new(2.0, "x")),
            Operation::SubtractVariable(VariableTerm::new(0.5, "y")),
            Operation::SubtractVariable(VariableTerm::new(1.0, "z")),
        ];
        let assignment = |name: &str| match name {
            "x" => Some(2.0),
            "y" => Some(-1.0),
            "z" => Some(10.0),
            _ => None,
        };

        for equation in &equations {
            let (left, right) = parse_equation(equation).unwrap();

            for op in &operations {
                let (new_left, new_right) =
                    apply_to_both_sides(&left, &right, op).unwrap();

                let l = new_left.evaluate(assignment).unwrap();
                let r = new_right.evaluate(assignment).unwrap();
                approx::assert_abs_diff_eq!(l, r, epsilon = TIGHT_TOLERANCE);
            }
        }
    }

    #[test]
    fn parse_operations() {
        let inputs = vec![
            ("add 3", Operation::Add(3.0)),
            ("+ 2.5", Operation::Add(2.5)),
            ("sub 2", Operation::Subtract(2.0)),
            ("subtract -1", Operation::Subtract(-1.0)),
            ("mul -1", Operation::Multiply(-1.0)),
            ("multiply by 4", Operation::Multiply(4.0)),
            ("DIV 4", Operation::Divide(4.0)),
            ("divide 0", Operation::Divide(0.0)),
            (
                "add 2x",
                Operation::AddVariable(VariableTerm::new(2.0, "x")),
            ),
            (
                "sub -y",
                Operation::SubtractVariable(VariableTerm::new(-1.0, "y")),
            ),
        ];

        for (src, should_be) in inputs {
            let got: Operation = src.parse().unwrap();
            assert_eq!(got, should_be, "{:?}", src);
        }
    }

    #[test]
    fn invalid_operation_text() {
        let inputs = vec![
            ("add", ParseOperationError::MissingOperand),
            ("jump 3", ParseOperationError::UnknownVerb("jump".into())),
            ("mul x", ParseOperationError::NeedsNumber),
            ("div 2y", ParseOperationError::NeedsNumber),
        ];

        for (src, should_be) in inputs {
            let got = src.parse::<Operation>().unwrap_err();
            assert_eq!(got, should_be, "{:?}", src);
        }

        assert!(matches!(
            "add 2$".parse::<Operation>(),
            Err(ParseOperationError::Operand(_))
        ));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let inputs = vec![
            Operation::Add(-3.0),
            Operation::Subtract(0.5),
            Operation::Multiply(4.0),
            Operation::Divide(-2.0),
            Operation::AddVariable(VariableTerm::new(1.0, "x")),
            Operation::SubtractVariable(VariableTerm::new(-2.5, "y")),
        ];

        for op in inputs {
            let got: Operation = op.to_string().parse().unwrap();
            assert_eq!(got, op);
        }
    }

    #[test]
    fn descriptions() {
        let inputs = vec![
            (Operation::Add(1.0), "Added 1 to both sides."),
            (Operation::Subtract(2.5), "Subtracted 2.5 from both sides."),
            (Operation::Multiply(3.0), "Multiplied both sides by 3."),
            (Operation::Divide(4.0), "Divided both sides by 4."),
            (
                Operation::AddVariable(VariableTerm::new(1.0, "x")),
                "Added x to both sides.",
            ),
            (
                Operation::SubtractVariable(VariableTerm::new(2.0, "x")),
                "Subtracted 2x from both sides.",
            ),
        ];

        for (op, should_be) in inputs {
            assert_eq!(op.describe(), should_be);
        }
    }
}
