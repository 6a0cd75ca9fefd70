//! # Muncher
//!
//! Groups a run of non-marker tokens into a single expression.
//!
//! - Consumes tokens up to (not including) the next stage marker
//! - A leading `-q` turns the run into a quoted string literal
//! - Consuming nothing is valid; stages decide whether that is acceptable

use crate::primitives::{QUOTE, is_marker};

/// Stage argument text: raw source for the evaluator, or a quoted literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// Space-joined tokens handed to the evaluator.
    Source(String),
    /// Tokens treated as a string constant, never evaluated.
    Quoted(Vec<String>),
}

impl Expression {
    /// The literal string a quoted expression stands for.
    #[must_use]
    pub fn quoted_text(tokens: &[String]) -> String {
        tokens.join(" ")
    }

    /// Text used in messages and as the command template.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Source(s) => s.clone(),
            Self::Quoted(tokens) => Self::quoted_text(tokens),
        }
    }

    /// Check if nothing was munched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Source(s) => s.is_empty(),
            Self::Quoted(tokens) => tokens.is_empty(),
        }
    }
}

/// Result of munching: how many tokens were used and what they formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Munch {
    /// Tokens consumed, including a leading quote marker.
    pub consumed: usize,
    /// The munched tokens, without the quote marker.
    pub tokens: Vec<String>,
    /// Whether the run was introduced by the quote marker.
    pub quoted: bool,
}

impl Munch {
    /// Assemble the tokens into an expression.
    #[must_use]
    pub fn expression(&self) -> Expression {
        if self.quoted {
            Expression::Quoted(self.tokens.clone())
        } else {
            Expression::Source(self.tokens.join(" "))
        }
    }

    /// Split off the last token, assembling the rest into an expression.
    ///
    /// Used by reduce, whose final token is the seed.
    #[must_use]
    pub fn split_last(&self) -> Option<(Expression, String)> {
        let (last, rest) = self.tokens.split_last()?;
        let expression = if self.quoted {
            Expression::Quoted(rest.to_vec())
        } else {
            Expression::Source(rest.join(" "))
        };
        Some((expression, last.clone()))
    }
}

/// Munch the longest run of non-marker tokens from the front of `tokens`.
#[must_use]
pub fn munch(tokens: &[String]) -> Munch {
    let (quoted, rest) = match tokens.split_first() {
        Some((first, rest)) if first == QUOTE => (true, rest),
        _ => (false, tokens),
    };

    let run: Vec<String> = rest
        .iter()
        .take_while(|t| !is_marker(t))
        .cloned()
        .collect();

    Munch {
        consumed: run.len() + usize::from(quoted),
        tokens: run,
        quoted,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn munches_until_marker() {
        let m = munch(&toks(&["acc", "+", "x", "-j", "x"]));
        assert_eq!(m.consumed, 3);
        assert_eq!(m.expression(), Expression::Source("acc + x".into()));
    }

    #[test]
    fn munches_to_end() {
        let m = munch(&toks(&["x>2"]));
        assert_eq!(m.consumed, 1);
        assert!(!m.quoted);
    }

    #[test]
    fn zero_tokens_is_valid() {
        let m = munch(&toks(&["-f", "x"]));
        assert_eq!(m.consumed, 0);
        assert!(m.expression().is_empty());
    }

    #[test]
    fn quote_marker_wraps_literal() {
        let m = munch(&toks(&["-q", "hello,", "world", "-j", "x"]));
        assert_eq!(m.consumed, 3);
        assert_eq!(
            m.expression(),
            Expression::Quoted(toks(&["hello,", "world"]))
        );
        assert_eq!(m.expression().text(), "hello, world");
    }

    #[test]
    fn split_last_separates_seed() {
        let m = munch(&toks(&["acc", "+", "x", "0"]));
        let (expr, seed) = m.split_last().expect("tokens");
        assert_eq!(expr, Expression::Source("acc + x".into()));
        assert_eq!(seed, "0");
        assert!(munch(&[]).split_last().is_none());
    }
}
