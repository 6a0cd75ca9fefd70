//! # Stage Dispatcher
//!
//! Classifies the leading token of the remaining input into one of the fixed
//! stage kinds and reports how many tokens the stage consumed.
//!
//! Dispatch is purely syntactic. Whether a name exists or a stack index is in
//! range is checked when the stage is applied to the pipeline state.

use crate::muncher::{Expression, munch};
use crate::primitives::{
    COMBINE, COMBINE_SEPARATOR, DISABLE_STACKING, DROP, ERROR_HANDLER, EXPRESSION, FILTER,
    FLAT_MAP, IMPORT, LOG, NAME, REDUCE, SEEK, SHELL, STACK_REF, SUPPRESS_PRINT, TERMINATE,
    WHOLE_ARRAY, WRITE,
};
use crate::types::BashoError;

/// One pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Evaluate an expression per item, or once when there is no input.
    Evaluate(Expression),

    /// Materialize the sequence into a single list item.
    WholeArray,

    /// Advance named sequences in lockstep.
    Combine(Vec<String>),

    /// Undo the last stage using the result stack.
    Drop,

    /// Run a command template.
    Shell(Expression),

    /// Rewrite error items.
    ErrorHandler(Expression),

    /// Keep items whose predicate is truthy.
    Filter(Expression),

    /// Bind a module's exports under an alias.
    Import { reference: String, alias: String },

    /// Evaluate per item and flatten list results one level.
    FlatMap(Expression),

    /// Register the current sequence under a name.
    Name(String),

    /// Stop appending to the result stack.
    DisableStacking,

    /// Clear the must-print flag.
    SuppressPrint,

    /// Fold the sequence; `seed` is evaluated once for the initial accumulator.
    Reduce { expression: Expression, seed: Expression },

    /// Resume from a named sequence.
    Seek(String),

    /// Resume from the stack entry `n` positions from the end.
    StackRef(usize),

    /// Stop at the first item whose predicate is exactly `true`.
    Terminate(Expression),

    /// Pass items through, sending an evaluated value to the log sink.
    Log(Expression),

    /// Pass items through, sending an evaluated value to the write sink.
    Write(Expression),
}

impl Stage {
    /// Parse the stage at the front of `tokens`.
    ///
    /// Returns the stage and the number of tokens it consumed, marker
    /// included. Tokens that are not a marker (and the quote marker itself)
    /// begin an implicit evaluate stage.
    ///
    /// # Errors
    ///
    /// Returns `MissingArgument` when a marker lacks a required argument and
    /// `InvalidArgument` when a stack index is not a number.
    pub fn parse(tokens: &[String]) -> Result<(Self, usize), BashoError> {
        let Some((marker, args)) = tokens.split_first() else {
            return Err(BashoError::MissingArgument {
                stage: "pipeline",
                what: "a stage",
            });
        };

        let with_expression = |build: fn(Expression) -> Self| {
            let m = munch(args);
            (build(m.expression()), m.consumed + 1)
        };

        let parsed = match marker.as_str() {
            WHOLE_ARRAY => (Self::WholeArray, 1),
            DROP => (Self::Drop, 1),
            DISABLE_STACKING => (Self::DisableStacking, 1),
            SUPPRESS_PRINT => (Self::SuppressPrint, 1),
            COMBINE => {
                let names = argument(args, 0, COMBINE, "a comma separated list of names")?
                    .split(COMBINE_SEPARATOR)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                if names.is_empty() {
                    return Err(BashoError::MissingArgument {
                        stage: COMBINE,
                        what: "at least one name",
                    });
                }
                (Self::Combine(names), 2)
            }
            NAME => (Self::Name(argument(args, 0, NAME, "a name")?.to_string()), 2),
            SEEK => (Self::Seek(argument(args, 0, SEEK, "a name")?.to_string()), 2),
            STACK_REF => {
                let raw = argument(args, 0, STACK_REF, "a stack index")?;
                let index = raw.parse::<usize>().map_err(|_| BashoError::InvalidArgument {
                    stage: STACK_REF,
                    value: raw.to_string(),
                })?;
                (Self::StackRef(index), 2)
            }
            IMPORT => {
                let reference = argument(args, 0, IMPORT, "a module reference")?.to_string();
                let alias = argument(args, 1, IMPORT, "an alias")?.to_string();
                (Self::Import { reference, alias }, 3)
            }
            REDUCE => {
                let m = munch(args);
                let (expression, seed) = m.split_last().ok_or(BashoError::MissingArgument {
                    stage: REDUCE,
                    what: "an expression and a seed",
                })?;
                if expression.is_empty() {
                    return Err(BashoError::MissingArgument {
                        stage: REDUCE,
                        what: "an expression and a seed",
                    });
                }
                let seed = if m.quoted {
                    Expression::Quoted(vec![seed])
                } else {
                    Expression::Source(seed)
                };
                (Self::Reduce { expression, seed }, m.consumed + 1)
            }
            EXPRESSION => with_expression(Self::Evaluate),
            SHELL => with_expression(Self::Shell),
            ERROR_HANDLER => with_expression(Self::ErrorHandler),
            FILTER => with_expression(Self::Filter),
            FLAT_MAP => with_expression(Self::FlatMap),
            TERMINATE => with_expression(Self::Terminate),
            LOG => with_expression(Self::Log),
            WRITE => with_expression(Self::Write),
            _ => {
                let m = munch(tokens);
                (Self::Evaluate(m.expression()), m.consumed)
            }
        };

        Ok(parsed)
    }

    /// Short kind name, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Evaluate(_) => "evaluate",
            Self::WholeArray => "whole-array",
            Self::Combine(_) => "combine",
            Self::Drop => "drop",
            Self::Shell(_) => "shell",
            Self::ErrorHandler(_) => "error-handler",
            Self::Filter(_) => "filter",
            Self::Import { .. } => "import",
            Self::FlatMap(_) => "flat-map",
            Self::Name(_) => "name",
            Self::DisableStacking => "disable-stacking",
            Self::SuppressPrint => "suppress-print",
            Self::Reduce { .. } => "reduce",
            Self::Seek(_) => "seek",
            Self::StackRef(_) => "stack-ref",
            Self::Terminate(_) => "terminate",
            Self::Log(_) => "log",
            Self::Write(_) => "write",
        }
    }
}

fn argument<'a>(
    args: &'a [String],
    position: usize,
    stage: &'static str,
    what: &'static str,
) -> Result<&'a str, BashoError> {
    args.get(position)
        .map(String::as_str)
        .ok_or(BashoError::MissingArgument { stage, what })
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

    fn parse(items: &[&str]) -> (Stage, usize) {
        Stage::parse(&toks(items)).expect("parse")
    }

    #[test]
    fn fallback_munches_leading_expression() {
        let (stage, consumed) = parse(&["[1,2,3,4]", "-f", "x>2"]);
        assert_eq!(stage, Stage::Evaluate(Expression::Source("[1,2,3,4]".into())));
        assert_eq!(consumed, 1);
    }

    #[test]
    fn expression_markers_count_the_marker() {
        let (stage, consumed) = parse(&["-f", "x", ">", "2", "-j", "x"]);
        assert_eq!(stage, Stage::Filter(Expression::Source("x > 2".into())));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn leading_quote_is_an_evaluate_stage() {
        let (stage, consumed) = parse(&["-q", "hello,", "world"]);
        assert_eq!(stage, Stage::Evaluate(Expression::Quoted(toks(&["hello,", "world"]))));
        assert_eq!(consumed, 3);
    }

    #[test]
    fn reduce_splits_off_seed() {
        let (stage, consumed) = parse(&["-r", "acc+x", "0", "-j", "x"]);
        assert_eq!(
            stage,
            Stage::Reduce {
                expression: Expression::Source("acc+x".into()),
                seed: Expression::Source("0".into()),
            }
        );
        assert_eq!(consumed, 3);
        assert!(matches!(
            Stage::parse(&toks(&["-r", "0"])),
            Err(BashoError::MissingArgument { .. })
        ));
    }

    #[test]
    fn combine_splits_names() {
        let (stage, consumed) = parse(&["-c", "add1,add2"]);
        assert_eq!(stage, Stage::Combine(toks(&["add1", "add2"])));
        assert_eq!(consumed, 2);
    }

    #[test]
    fn argument_stages() {
        assert_eq!(parse(&["-n", "add2"]), (Stage::Name("add2".into()), 2));
        assert_eq!(parse(&["-s", "add2"]), (Stage::Seek("add2".into()), 2));
        assert_eq!(parse(&["--stack", "1"]), (Stage::StackRef(1), 2));
        assert_eq!(
            parse(&["-i", "./cfg.json", "cfg", "cfg.limit"]),
            (
                Stage::Import {
                    reference: "./cfg.json".into(),
                    alias: "cfg".into()
                },
                3
            )
        );
    }

    #[test]
    fn flag_stages_consume_one_token() {
        assert_eq!(parse(&["-a", "x"]), (Stage::WholeArray, 1));
        assert_eq!(parse(&["-d"]), (Stage::Drop, 1));
        assert_eq!(parse(&["-p"]), (Stage::SuppressPrint, 1));
        assert_eq!(parse(&["--nostack"]), (Stage::DisableStacking, 1));
    }

    #[test]
    fn missing_and_invalid_arguments() {
        assert!(matches!(
            Stage::parse(&toks(&["-n"])),
            Err(BashoError::MissingArgument { stage: "-n", .. })
        ));
        assert!(matches!(
            Stage::parse(&toks(&["-i", "./cfg.json"])),
            Err(BashoError::MissingArgument { .. })
        ));
        assert!(matches!(
            Stage::parse(&toks(&["--stack", "two"])),
            Err(BashoError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn empty_expression_is_allowed() {
        let (stage, consumed) = parse(&["--error", "-j", "x"]);
        assert_eq!(stage, Stage::ErrorHandler(Expression::Source(String::new())));
        assert_eq!(consumed, 1);
    }
}
