//! Command templates: literal text with `${expr}` holes.
//!
//! Holes are evaluated with the stage's bindings and spliced in. Strings are
//! inserted raw; any other value as compact JSON.

use crate::collaborators::Evaluator;
use crate::{Bindings, Environment, Item};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Expression source between `${` and `}`.
    Hole(String),
}

/// A parsed command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `text`, splitting out `${...}` holes.
    ///
    /// Braces nest inside a hole, so `${ {a: 1}.a }` is one hole.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((start, ch)) = chars.next() {
            if ch == '$' && chars.peek().is_some_and(|&(_, c)| c == '{') {
                chars.next();
                let mut depth = 1usize;
                let mut hole = String::new();
                for (_, c) in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' => depth -= 1,
                        _ => {}
                    }
                    if depth == 0 {
                        break;
                    }
                    hole.push(c);
                }
                if depth != 0 {
                    return Err(format!("unterminated '${{' at offset {start}"));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Hole(hole.trim().to_string()));
            } else {
                literal.push(ch);
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// A template with no holes.
    #[must_use]
    pub fn verbatim(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Literal(text.into())],
        }
    }

    /// Evaluate every hole and produce the command text.
    pub async fn render(
        &self,
        evaluator: &dyn Evaluator,
        bindings: &Bindings,
        env: &Environment,
    ) -> Result<String, String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Hole(source) => match evaluator.evaluate(source, bindings, env).await? {
                    Item::Error(e) => return Err(e.message),
                    value => out.push_str(&value.to_string()),
                },
            }
        }
        Ok(out)
    }
}
