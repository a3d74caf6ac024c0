use crate::algebra::{Key, TermMap};
use log::warn;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    iter::Peekable,
    ops::Range,
};

/// Parse an equation like `"4x - 1 = 7"` into its left and right sides,
/// skipping any malformed terms.
pub fn parse_equation(s: &str) -> Result<(TermMap, TermMap), ParseError> {
    parse_equation_with(s, ParseMode::Lenient)
}

/// Parse an equation, using `mode` to decide what happens to malformed
/// terms.
pub fn parse_equation_with(
    s: &str,
    mode: ParseMode,
) -> Result<(TermMap, TermMap), ParseError> {
    let (left, right) = split_equation(s)?;
    let right_offset = left.len() + 1;

    Ok((side(left, 0, mode)?, side(right, right_offset, mode)?))
}

/// Parse one side of an equation, e.g. `"2.5x - y + 10"`.
///
/// Terms that don't fit the grammar are logged and dropped.
pub fn parse_side(s: &str) -> TermMap { lenient_side(s, 0) }

pub fn parse_side_with(s: &str, mode: ParseMode) -> Result<TermMap, ParseError> {
    side(s, 0, mode)
}

/// Parse a single signed term, e.g. `"-x"`, `"2.5y"` or `"10"`.
pub fn parse_term(s: &str) -> Result<Term, ParseError> {
    let mut terms = Terms::new(s, 0, ParseMode::Strict);

    let term = match terms.next() {
        Some(result) => result?,
        None => return Err(ParseError::UnexpectedEndOfInput),
    };

    match terms.tokens.next() {
        None => Ok(term),
        Some(Ok(token)) => Err(ParseError::UnexpectedToken {
            found: token.kind,
            span: token.span,
            expected: &[],
        }),
        Some(Err(e)) => Err(e),
    }
}

/// Split an equation into the text either side of its `=`.
pub(crate) fn split_equation(s: &str) -> Result<(&str, &str), ParseError> {
    match s.find('=') {
        Some(index) if !s[index + 1..].contains('=') => {
            Ok((&s[..index], &s[index + 1..]))
        },
        _ => Err(ParseError::Format {
            separators: s.matches('=').count(),
        }),
    }
}

fn side(s: &str, offset: usize, mode: ParseMode) -> Result<TermMap, ParseError> {
    match mode {
        ParseMode::Lenient => Ok(lenient_side(s, offset)),
        ParseMode::Strict => {
            let terms = Terms::new(s, offset, mode)
                .collect::<Result<Vec<_>, _>>()?;

            if terms.is_empty() {
                return Err(ParseError::UnexpectedEndOfInput);
            }

            Ok(terms.into_iter().map(Term::into_pair).collect())
        },
    }
}

fn lenient_side(s: &str, offset: usize) -> TermMap {
    Terms::new(s, offset, ParseMode::Lenient)
        .filter_map(|result| match result {
            Ok(term) => Some(term.into_pair()),
            Err(e) => {
                warn!("Skipping malformed term in \"{}\": {}", s.trim(), e);
                None
            },
        })
        .collect()
}

/// How to treat text that doesn't fit the term grammar.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseMode {
    /// Log a warning, skip the offending token and keep going.
    Lenient,
    /// Fail on the first malformed token.
    Strict,
}

impl Default for ParseMode {
    fn default() -> Self { ParseMode::Lenient }
}

/// A single signed term, `coefficient * key`.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub coefficient: f64,
    pub key: Key,
}

impl Term {
    fn into_pair(self) -> (Key, f64) { (self.key, self.coefficient) }
}

/// Splits the text for one side into [`Term`]s.
///
/// The grammar:
///
/// ```text
/// side   := term (("+" | "-") term)*
///
/// term   := sign? NUMBER? ("*"? LETTER)?
///         (at least one of NUMBER or LETTER)
///
/// sign   := "+" | "-"
/// ```
///
/// In lenient mode consecutive terms don't need a sign between them, so
/// `2x3` reads as `2x + 3`.
#[derive(Debug, Clone)]
pub(crate) struct Terms<'a> {
    tokens: Peekable<Tokens<'a>>,
    mode: ParseMode,
    first: bool,
}

impl<'a> Terms<'a> {
    pub(crate) fn new(src: &'a str, offset: usize, mode: ParseMode) -> Self {
        Terms {
            tokens: Tokens::new(src, offset).peekable(),
            mode,
            first: true,
        }
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.tokens
            .peek()
            .and_then(|result| result.as_ref().ok())
            .map(|tok| tok.kind)
    }

    fn advance(&mut self) -> Result<Token<'a>, ParseError> {
        match self.tokens.next() {
            Some(result) => result,
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        let is_first = std::mem::replace(&mut self.first, false);

        let sign = match self.peek() {
            Some(TokenKind::Plus) => {
                let _ = self.advance()?;
                1.0
            },
            Some(TokenKind::Minus) => {
                let _ = self.advance()?;
                -1.0
            },
            _ if !is_first && self.mode == ParseMode::Strict => {
                return Err(self.unexpected(&[TokenKind::Plus, TokenKind::Minus]));
            },
            _ => 1.0,
        };

        let number = match self.peek() {
            Some(TokenKind::Number) => Some(self.number()?),
            _ => None,
        };

        if number.is_some() && self.peek() == Some(TokenKind::Times) {
            // skip past the "*", it must be followed by a variable
            let _ = self.advance()?;

            if self.peek() != Some(TokenKind::Letter) {
                return Err(self.unexpected(&[TokenKind::Letter]));
            }
        }

        let variable = match self.peek() {
            Some(TokenKind::Letter) => Some(Key::variable(self.advance()?.text)),
            _ => None,
        };

        match (number, variable) {
            (Some(number), Some(key)) => Ok(Term {
                coefficient: sign * number,
                key,
            }),
            // a bare "x" or "-x"
            (None, Some(key)) => Ok(Term {
                coefficient: sign,
                key,
            }),
            (Some(number), None) => Ok(Term {
                coefficient: sign * number,
                key: Key::Constant,
            }),
            (None, None) => Err(self.unexpected(&[
                TokenKind::Number,
                TokenKind::Letter,
            ])),
        }
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let token = self.advance()?;
        debug_assert_eq!(token.kind, TokenKind::Number);

        match token.text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ParseError::InvalidNumber {
                text: token.text.to_string(),
                span: token.span,
            }),
        }
    }

    /// Create an error for the token we just looked at.
    ///
    /// The offending token is consumed so parsing can make progress, unless
    /// it's a sign. We've always consumed something by the time a sign is
    /// unexpected, and leaving it lets it start the next term.
    fn unexpected(&mut self, expected: &'static [TokenKind]) -> ParseError {
        match self.peek() {
            Some(TokenKind::Plus) | Some(TokenKind::Minus) => {
                match self.tokens.peek() {
                    Some(Ok(token)) => ParseError::UnexpectedToken {
                        found: token.kind,
                        span: token.span.clone(),
                        expected,
                    },
                    _ => ParseError::UnexpectedEndOfInput,
                }
            },
            _ => match self.tokens.next() {
                Some(Ok(Token { kind, span, .. })) => {
                    ParseError::UnexpectedToken {
                        found: kind,
                        span,
                        expected,
                    }
                },
                Some(Err(e)) => e,
                None => ParseError::UnexpectedEndOfInput,
            },
        }
    }
}

impl<'a> Iterator for Terms<'a> {
    type Item = Result<Term, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.tokens.peek()?;
        Some(self.term())
    }
}

/// Possible errors that may occur while parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The equation didn't contain exactly one `=`.
    Format {
        separators: usize,
    },
    InvalidCharacter {
        character: char,
        index: usize,
    },
    InvalidNumber {
        text: String,
        span: Range<usize>,
    },
    UnexpectedEndOfInput,
    UnexpectedToken {
        found: TokenKind,
        span: Range<usize>,
        expected: &'static [TokenKind],
    },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Format { separators } => write!(
                f,
                "Invalid equation format, expected \"left = right\" but found {} \"=\"",
                separators
            ),
            ParseError::InvalidCharacter { character, index } => {
                write!(f, "Invalid character, {:?}, at index {}", character, index)
            },
            ParseError::InvalidNumber { text, span } => {
                write!(f, "\"{}\" at {:?} isn't a valid number", text, span)
            },
            ParseError::UnexpectedEndOfInput => {
                write!(f, "Unexpected end of input")
            },
            ParseError::UnexpectedToken {
                found,
                span,
                expected,
            } => {
                write!(f, "Found {} at {:?}", found, span)?;

                if !expected.is_empty() {
                    let expected: Vec<_> =
                        expected.iter().map(ToString::to_string).collect();
                    write!(f, " but expected {}", expected.join(" or "))?;
                }

                Ok(())
            },
        }
    }
}

impl Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
struct Tokens<'a> {
    src: &'a str,
    cursor: usize,
    /// Where `src` starts within the full equation, used for error spans.
    offset: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str, offset: usize) -> Self {
        Tokens {
            src,
            cursor: 0,
            offset,
        }
    }

    fn rest(&self) -> &'a str { &self.src[self.cursor..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn peek_second(&self) -> Option<char> { self.rest().chars().nth(1) }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    fn chomp(
        &mut self,
        kind: TokenKind,
    ) -> Option<Result<Token<'a>, ParseError>> {
        let start = self.cursor;
        self.advance()?;
        let end = self.cursor;

        Some(Ok(self.token(start..end, kind)))
    }

    fn take_while<P>(&mut self, mut predicate: P)
    where
        P: FnMut(char) -> bool,
    {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }
    }

    fn chomp_number(&mut self) -> Token<'a> {
        let start = self.cursor;
        self.take_while(|c| c.is_ascii_digit());

        if self.peek() == Some('.') {
            // skip past the decimal
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }

        let end = self.cursor;

        self.token(start..end, TokenKind::Number)
    }

    fn token(&self, span: Range<usize>, kind: TokenKind) -> Token<'a> {
        Token {
            text: &self.src[span.clone()],
            span: span.start + self.offset..span.end + self.offset,
            kind,
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.peek()? {
                space if space.is_whitespace() => {
                    self.advance();
                    continue;
                },
                '(' => self.chomp(TokenKind::OpenParen),
                ')' => self.chomp(TokenKind::CloseParen),
                '+' => self.chomp(TokenKind::Plus),
                '-' => self.chomp(TokenKind::Minus),
                '*' => self.chomp(TokenKind::Times),
                '/' => self.chomp(TokenKind::Divide),
                // variables are a single letter, "xy" is "x + y"
                'a'..='z' | 'A'..='Z' => self.chomp(TokenKind::Letter),
                '0'..='9' => Some(Ok(self.chomp_number())),
                '.' if self
                    .peek_second()
                    .map(|c| c.is_ascii_digit())
                    .unwrap_or(false) =>
                {
                    Some(Ok(self.chomp_number()))
                },
                other => {
                    let index = self.cursor + self.offset;
                    self.advance();
                    Some(Err(ParseError::InvalidCharacter {
                        character: other,
                        index,
                    }))
                },
            };
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    span: Range<usize>,
    kind: TokenKind,
}

/// The kinds of token that can appear in an equation's text form.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    Letter,
    Number,
    OpenParen,
    CloseParen,
    Plus,
    Minus,
    Times,
    Divide,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Letter => write!(f, "a variable"),
            TokenKind::Number => write!(f, "a number"),
            TokenKind::OpenParen => write!(f, "\"(\""),
            TokenKind::CloseParen => write!(f, "\")\""),
            TokenKind::Plus => write!(f, "\"+\""),
            TokenKind::Minus => write!(f, "\"-\""),
            TokenKind::Times => write!(f, "\"*\""),
            TokenKind::Divide => write!(f, "\"/\""),
        }
    }
}


#[cfg(test)]
mod parser_tests {
    use super::*;

    fn x() -> Key { Key::variable("x") }

    macro_rules! term_test {
        ($name:ident, $src:expr, $coefficient:expr, $key:expr) => {
            #[test]
            fn $name() {
                let got = parse_term($src).unwrap();

                assert_eq!(
                    got,
                    Term {
                        coefficient: $coefficient,
                        key: $key
                    }
                );
            }
        };
    }

    term_test!(bare_variable, "x", 1.0, x());
    term_test!(negative_bare_variable, "-x", -1.0, x());
    term_test!(positive_bare_variable, "+x", 1.0, x());
    term_test!(coefficient_and_variable, "2.5x", 2.5, x());
    term_test!(negative_coefficient, "-3y", -3.0, Key::variable("y"));
    term_test!(explicit_multiplication, "4*x", 4.0, x());
    term_test!(spaces_inside_term, "- 4 x", -4.0, x());
    term_test!(bare_number, "10", 10.0, Key::Constant);
    term_test!(negative_decimal, "-0.25", -0.25, Key::Constant);
    term_test!(zero_coefficient, "0x", 0.0, x());

    #[test]
    fn malformed_terms() {
        let inputs = vec!["", "-", "+", "2*", "*x", "2x3", "(", "x$", "--x"];

        for src in inputs {
            assert!(parse_term(src).is_err(), "{:?} should fail", src);
        }
    }

    #[test]
    fn numbers_too_large_for_an_f64_are_invalid() {
        let huge = "9".repeat(400);
        let src = format!("{}x + 1", huge);

        assert_eq!(
            parse_term(&format!("{}x", huge)),
            Err(ParseError::InvalidNumber {
                text: huge.clone(),
                span: 0..400,
            })
        );
        assert!(matches!(
            parse_side_with(&src, ParseMode::Strict),
            Err(ParseError::InvalidNumber { .. })
        ));

        let got = parse_side(&src);
        assert!(got.is_finite(), "{:?}", got);
    }

    #[test]
    fn parse_a_side() {
        let got = parse_side("2x + 3 - x + 0.5 - y");

        assert_eq!(got.coefficient(&x()), 1.0);
        assert_eq!(got.coefficient(&Key::variable("y")), -1.0);
        assert_eq!(got.constant_term(), 3.5);
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn empty_and_cancelling_sides_are_zero() {
        let inputs = vec!["", "   ", "0", "x - x", "2 - 2", "0x"];

        for src in inputs {
            let got = parse_side(src);
            assert_eq!(got, TermMap::zero(), "{:?}", src);
        }
    }

    #[test]
    fn parse_a_full_equation() {
        let (left, right) = parse_equation("4x - 1 = 7").unwrap();

        let should_be: TermMap =
            vec![(x(), 4.0), (Key::Constant, -1.0)].into_iter().collect();
        assert_eq!(left, should_be);
        assert_eq!(right, TermMap::constant(7.0));
    }

    #[test]
    fn equations_need_exactly_one_equals() {
        let inputs = vec![("x + 1", 0), ("x = 1 = 2", 2), ("x == 2", 2)];

        for (src, separators) in inputs {
            let got = parse_equation(src).unwrap_err();
            assert_eq!(got, ParseError::Format { separators });
        }
    }

    #[test]
    fn lenient_mode_skips_malformed_tokens() {
        // Leniency can silently change the equation, "2(x + 1)" is read as
        // "2 + x + 1" rather than "2x + 2"
        let got = parse_side("2(x + 1)");

        assert_eq!(got.coefficient(&x()), 1.0);
        assert_eq!(got.constant_term(), 3.0);
    }

    #[test]
    fn lenient_mode_drops_a_dangling_sign() {
        let got = parse_side("x - - 3 $");

        assert_eq!(got.coefficient(&x()), 1.0);
        assert_eq!(got.constant_term(), -3.0);
    }

    #[test]
    fn lenient_mode_allows_missing_operators() {
        let got = parse_side("2x3");

        assert_eq!(got.coefficient(&x()), 2.0);
        assert_eq!(got.constant_term(), 3.0);
    }

    #[test]
    fn strict_mode_rejects_what_lenient_mode_skips() {
        let inputs = vec![
            "2(x + 1) = 8",
            "x / 2 + 1 = 5",
            "x - - 3 = 1",
            "2x3 = 1",
            "x + = 1",
            "x = $",
            " = 5",
        ];

        for src in inputs {
            assert!(parse_equation(src).is_ok(), "{:?} is fine leniently", src);
            assert!(
                parse_equation_with(src, ParseMode::Strict).is_err(),
                "{:?} should fail in strict mode",
                src
            );
        }
    }

    #[test]
    fn strict_errors_point_into_the_whole_equation() {
        let got = parse_equation_with("x = 1 $", ParseMode::Strict);

        assert_eq!(
            got,
            Err(ParseError::InvalidCharacter {
                character: '$',
                index: 6
            })
        );
    }

    #[test]
    fn strict_mode_accepts_well_formed_equations() {
        let inputs = vec![
            "x + 1 = 4",
            "-3x = 9",
            "5 - x = 2x + 11",
            "0.5x + 1 = 3",
            "2*x - y = .5",
        ];

        for src in inputs {
            let strict = parse_equation_with(src, ParseMode::Strict).unwrap();
            let lenient = parse_equation(src).unwrap();
            assert_eq!(strict, lenient);
        }
    }

    #[test]
    fn formatted_sides_reparse_to_the_same_terms() {
        let inputs = vec![
            "4x - 1",
            "-x + 2y - 3",
            "0.5x + 1",
            "7",
            "-2.25",
            "x - x",
            "y + 0.1 + 0.2",
            "-x - y - z",
            "1.5a + 2b - 3c + 4",
        ];

        for src in inputs {
            let original = parse_side(src);
            let formatted = original.to_string();
            let round_tripped = parse_side(&formatted);

            assert!(
                round_tripped.approx_eq(
                    &original,
                    crate::algebra::TIGHT_TOLERANCE
                ),
                "{:?} -> {:?} -> {:?}",
                src,
                formatted,
                round_tripped
            );
        }
    }
}
