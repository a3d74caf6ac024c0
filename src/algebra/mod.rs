//! The symbolic algebra system.

pub mod ops;
mod parse;
mod terms;

pub use parse::{
    parse_equation, parse_equation_with, parse_side, parse_side_with,
    parse_term, ParseError, ParseMode, Term, TokenKind,
};
pub(crate) use parse::{split_equation, Terms};
pub use terms::{format_side, Key, TermMap, ANSWER_TOLERANCE, TIGHT_TOLERANCE};
