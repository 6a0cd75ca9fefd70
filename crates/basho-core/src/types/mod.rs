//! # Core Type Definitions
//!
//! This module contains the data model shared by every part of the interpreter:
//! - Produced values (`Item`) and recoverable per-item failures (`ErrorValue`)
//! - Expression bindings (`Bindings`) and the import namespace (`Environment`)
//! - Construction-time error types (`BashoError`)
//!
//! ## Errors as data
//!
//! A failure while producing one item does not abort the pipeline. It becomes an
//! `Item::Error` that flows downstream like any other value until an
//! error-handler stage rewrites it or the caller receives it. Only failures
//! while *building* a stage (unknown names, bad stack indexes, duplicate names)
//! are reported as `BashoError`.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// ERROR VALUE
// =============================================================================

/// A recoverable failure attached to a single item.
///
/// Serializes as `{message, cause}`, plus `value` when present. That object
/// is how an error appears inside a materialized list and what an
/// expression sees when it reads a field of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorValue {
    /// Human readable description, naming the expression or command.
    pub message: String,
    /// The underlying cause reported by the collaborator.
    pub cause: String,
    /// The list a materializing stage built around its failed members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ErrorValue {
    /// Create a new error value.
    #[must_use]
    pub fn new(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: cause.into(),
            value: None,
        }
    }

    /// One error standing for every failed member of `list`.
    ///
    /// Messages are joined one per line and causes with `; `. The list
    /// itself, errors in place, is kept as `value`.
    #[must_use]
    pub fn gathered(errors: &[ErrorValue], list: Value) -> Self {
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        let causes: Vec<&str> = errors.iter().map(|e| e.cause.as_str()).collect();
        Self {
            message: messages.join("\n"),
            cause: causes.join("; "),
            value: Some(list),
        }
    }

    /// The error as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::String(self.message.clone()))
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// =============================================================================
// ITEM
// =============================================================================

/// One element of a sequence: a value, or a failure carried as data.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A produced value.
    Value(Value),
    /// A per-item failure.
    Error(ErrorValue),
}

impl Item {
    /// Wrap anything convertible to a JSON value.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Create an error item.
    #[must_use]
    pub fn error(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Error(ErrorValue::new(message, cause))
    }

    /// Check if this item is an `ErrorValue`.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Borrow the value, if this is not an error.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Error(_) => None,
        }
    }

    /// Borrow the error, if this is one.
    #[must_use]
    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Self::Value(_) => None,
            Self::Error(e) => Some(e),
        }
    }

    /// Truthiness as used by filter predicates.
    ///
    /// `null`, `false`, `0` and `""` are falsy. Arrays, objects and error
    /// values are always truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Value(Value::Null) => false,
            Self::Value(Value::Bool(b)) => *b,
            Self::Value(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Self::Value(Value::String(s)) => !s.is_empty(),
            Self::Value(Value::Array(_) | Value::Object(_)) | Self::Error(_) => true,
        }
    }

    /// True only for the boolean `true` itself, not merely truthy values.
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Value(Value::Bool(true)))
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ErrorValue> for Item {
    fn from(error: ErrorValue) -> Self {
        Self::Error(error)
    }
}

/// Strings print raw; everything else prints as compact JSON.
impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(Value::String(s)) => f.write_str(s),
            Self::Value(v) => write!(f, "{v}"),
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

// =============================================================================
// BINDINGS
// =============================================================================

/// Binding name for the current item.
pub const BIND_VALUE: &str = "value";
/// Binding name for the position of the current item.
pub const BIND_INDEX: &str = "index";
/// Binding name for the running reduce accumulator.
pub const BIND_ACCUMULATOR: &str = "accumulator";
/// Binding name for the error being handled.
pub const BIND_ERROR: &str = "error";

/// Named inputs handed to the evaluator along with the source text.
///
/// Empty when evaluating an initial or seed expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: BTreeMap<String, Item>,
}

impl Bindings {
    /// Create empty bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `{value, index}` for mapping over an existing sequence.
    #[must_use]
    pub fn for_item(value: Item, index: usize) -> Self {
        Self::new()
            .with(BIND_VALUE, value)
            .with(BIND_INDEX, Item::value(index))
    }

    /// `{error, index}` for the error-handler stage.
    #[must_use]
    pub fn for_error(error: Item, index: usize) -> Self {
        Self::new()
            .with(BIND_ERROR, error)
            .with(BIND_INDEX, Item::value(index))
    }

    /// `{accumulator, value, index}` for reduce.
    #[must_use]
    pub fn for_fold(accumulator: Item, value: Item, index: usize) -> Self {
        Self::new()
            .with(BIND_ACCUMULATOR, accumulator)
            .with(BIND_VALUE, value)
            .with(BIND_INDEX, Item::value(index))
    }

    /// Add or replace a binding.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, item: Item) -> Self {
        self.entries.insert(name.into(), item);
        self
    }

    /// Look up a binding by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Item> {
        self.entries.get(name)
    }

    /// Check if there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Aliases bound by import stages, visible to every later evaluation.
///
/// Never mutated: `with_alias` returns a new environment, so stages built
/// before an import keep seeing the namespace they were built with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    aliases: BTreeMap<String, Value>,
}

impl Environment {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of this environment with `alias` bound to `exports`.
    #[must_use]
    pub fn with_alias(&self, alias: impl Into<String>, exports: Value) -> Self {
        let mut aliases = self.aliases.clone();
        aliases.insert(alias.into(), exports);
        Self { aliases }
    }

    /// Look up the exports bound to an alias.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.aliases.get(alias)
    }

    /// Number of bound aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Check if no alias is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Construction-time errors. Any of these aborts the whole pipeline.
///
/// Per-item failures are `ErrorValue`s instead and never appear here.
#[derive(Debug, Error)]
pub enum BashoError {
    /// A name was registered twice in one run.
    #[error("Name '{name}' is already bound to a sequence")]
    Naming { name: String },

    /// The current sequence already carries a name.
    #[error("Cannot name already named sequence {name}")]
    AlreadyNamed { name: String },

    /// A seek or combine referenced a name that was never registered.
    #[error("No sequence named '{name}'")]
    UnknownName { name: String },

    /// A stack reference reached past the bottom of the result stack.
    #[error("Stack index {index} is out of range (stack depth {depth})")]
    StackIndexOutOfRange { index: usize, depth: usize },

    /// Drop needs at least two checkpoints on the stack.
    #[error("Cannot drop a result: the stack holds {depth} entries, at least 2 are needed")]
    StackUnderflow { depth: usize },

    /// A stage marker was not followed by a required argument.
    #[error("{stage} requires {what}")]
    MissingArgument { stage: &'static str, what: &'static str },

    /// A stage argument could not be interpreted.
    #[error("{stage}: invalid argument '{value}'")]
    InvalidArgument { stage: &'static str, value: String },

    /// A module could not be loaded.
    #[error("failed to import '{reference}': {cause}")]
    Import { reference: String, cause: String },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_loose_rules() {
        assert!(!Item::value(json!(null)).is_truthy());
        assert!(!Item::value(json!(0)).is_truthy());
        assert!(!Item::value(json!("")).is_truthy());
        assert!(!Item::value(false).is_truthy());
        assert!(Item::value(json!([])).is_truthy());
        assert!(Item::value(json!({})).is_truthy());
        assert!(Item::value(-1).is_truthy());
        assert!(Item::error("boom", "cause").is_truthy());
    }

    #[test]
    fn only_boolean_true_is_true() {
        assert!(Item::value(true).is_true());
        assert!(!Item::value(1).is_true());
        assert!(!Item::value("true").is_true());
    }

    #[test]
    fn display_prints_strings_raw() {
        assert_eq!(Item::value("hello, world").to_string(), "hello, world");
        assert_eq!(Item::value(json!([11, 13])).to_string(), "[11,13]");
        assert_eq!(Item::error("bad", "x").to_string(), "bad");
    }

    #[test]
    fn gathered_error_keeps_every_member() {
        let errors = [ErrorValue::new("first", "a"), ErrorValue::new("second", "b")];
        let list = json!([1, errors[0].to_value(), errors[1].to_value()]);
        let gathered = ErrorValue::gathered(&errors, list.clone());
        assert_eq!(gathered.message, "first\nsecond");
        assert_eq!(gathered.cause, "a; b");
        assert_eq!(gathered.value, Some(list));
        assert_eq!(
            gathered.to_value()["value"][2],
            json!({"message": "second", "cause": "b"})
        );
    }

    #[test]
    fn bindings_builders() {
        let b = Bindings::for_fold(Item::value(1), Item::value(2), 3);
        assert_eq!(b.get(BIND_ACCUMULATOR), Some(&Item::value(1)));
        assert_eq!(b.get(BIND_VALUE), Some(&Item::value(2)));
        assert_eq!(b.get(BIND_INDEX), Some(&Item::value(3)));
        assert!(Bindings::new().is_empty());
    }

    #[test]
    fn environment_is_persistent() {
        let base = Environment::new();
        let extended = base.with_alias("cfg", json!({"limit": 3}));
        assert!(base.is_empty());
        assert_eq!(extended.len(), 1);
        assert_eq!(extended.get("cfg"), Some(&json!({"limit": 3})));
    }
}
