//! A symbolic engine for learning to solve linear equations by doing the
//! same thing to both sides.
//!
//! ```rust
//! use equilibrium::{ops::Operation, Equation};
//!
//! let equation: Equation = "4x - 1 = 7".parse().unwrap();
//!
//! let solved = equation
//!     .apply(&Operation::Add(1.0))
//!     .unwrap()
//!     .apply(&Operation::Divide(4.0))
//!     .unwrap();
//!
//! assert_eq!(solved.to_string(), "x = 2");
//! assert!(solved.is_solved_for("x"));
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod algebra;
mod equations;
pub mod levels;
pub mod session;
mod solve;

pub use algebra::{
    format_side, ops, parse_equation, parse_equation_with, parse_side,
    parse_side_with, parse_term, Key, ParseError, ParseMode, TermMap, Term,
    TokenKind, ANSWER_TOLERANCE, TIGHT_TOLERANCE,
};
pub use equations::{is_solved_form, Equation};
pub use levels::Level;
pub use session::{
    InMemoryProgress, ProgressStore, Session, SessionConfig, SessionError,
};
pub use solve::{solve, solve_with, Solution};
