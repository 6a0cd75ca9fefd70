//! # Stage Transforms
//!
//! Builds the sequence each stage kind produces from its input.
//!
//! Every builder is lazy: nothing is evaluated until the returned sequence is
//! iterated, and every iteration evaluates again. Evaluation and command
//! failures become `ErrorValue` items; none of these functions can fail.

use crate::collaborators::{CommandRunner, Evaluator, Sink};
use crate::muncher::Expression;
use crate::template::Template;
use crate::{Bindings, Environment, ErrorValue, Item, Sequence};
use serde_json::Value;
use std::sync::Arc;

/// Message for an expression that failed on an item.
pub fn evaluation_message(text: &str) -> String {
    format!("failed to evaluate expression: {text}.")
}

/// Message for an expression the evaluator rejected before any item.
pub fn compile_message(text: &str) -> String {
    format!("failed to compile expression: {text}.")
}

/// Message for a command template that failed to parse or render.
pub fn template_message(text: &str) -> String {
    format!("failed to evaluate command template: {text}.")
}

/// Message for a command that could not run or exited unsuccessfully.
pub fn command_message(text: &str) -> String {
    format!("failed to execute shell command: {text}")
}

// =============================================================================
// COMPILED EXPRESSIONS
// =============================================================================

#[derive(Debug)]
enum Compiled {
    Constant(Value),
    Source { source: String, message: String },
    Broken(ErrorValue),
}

/// An expression prepared for repeated evaluation within one stage.
///
/// Captures the environment in force when the stage was built.
#[derive(Clone)]
pub struct Prepared {
    compiled: Arc<Compiled>,
    evaluator: Arc<dyn Evaluator>,
    env: Arc<Environment>,
}

impl Prepared {
    /// Compile `expression` once. A compile failure is remembered and
    /// returned for every later call.
    pub fn new(
        expression: &Expression,
        evaluator: Arc<dyn Evaluator>,
        env: Arc<Environment>,
    ) -> Self {
        let compiled = match expression {
            Expression::Quoted(tokens) => {
                Compiled::Constant(Value::String(Expression::quoted_text(tokens)))
            }
            Expression::Source(source) => match evaluator.compile(source) {
                Ok(()) => Compiled::Source {
                    source: source.clone(),
                    message: evaluation_message(source),
                },
                Err(cause) => {
                    tracing::trace!(expression = %source, %cause, "expression failed to compile");
                    Compiled::Broken(ErrorValue::new(compile_message(source), cause))
                }
            },
        };
        Self {
            compiled: Arc::new(compiled),
            evaluator,
            env,
        }
    }

    /// Evaluate with the given bindings.
    pub async fn call(&self, bindings: Bindings) -> Item {
        match self.compiled.as_ref() {
            Compiled::Constant(value) => Item::Value(value.clone()),
            Compiled::Broken(error) => Item::Error(error.clone()),
            Compiled::Source { source, message } => {
                match self.evaluator.evaluate(source, &bindings, &self.env).await {
                    Ok(item) => item,
                    Err(cause) => {
                        tracing::trace!(expression = %source, %cause, "expression failed");
                        Item::error(message.clone(), cause)
                    }
                }
            }
        }
    }
}

/// Items produced by a list-valued result: the elements, or the item itself.
fn expand(item: Item) -> Vec<Item> {
    match item {
        Item::Value(Value::Array(values)) => values.into_iter().map(Item::Value).collect(),
        other => vec![other],
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

/// Evaluate per item with `{value, index}`, or once with no bindings.
///
/// With no input a list result expands into one item per element.
pub fn evaluate(input: Option<&Sequence>, f: Prepared) -> Sequence {
    match input {
        Some(input) => input.map(move |item, index| {
            let f = f.clone();
            async move { f.call(Bindings::for_item(item, index)).await }
        }),
        None => Sequence::deferred(move || {
            let f = f.clone();
            async move { expand(f.call(Bindings::new()).await) }
        }),
    }
}

/// A materialized list as one item.
///
/// When members failed, the item is an error naming all of them whose
/// `value` is the whole list, each error in place as `{message, cause}`.
fn gather(items: Vec<Item>) -> Item {
    let mut errors = Vec::new();
    let values: Vec<Value> = items
        .into_iter()
        .map(|item| match item {
            Item::Value(v) => v,
            Item::Error(e) => {
                let v = e.to_value();
                errors.push(e);
                v
            }
        })
        .collect();
    if errors.is_empty() {
        return Item::Value(Value::Array(values));
    }
    tracing::trace!(failed = errors.len(), "materialized list carries errors");
    Item::Error(ErrorValue::gathered(&errors, Value::Array(values)))
}

/// Materialize the input into a single list item.
pub fn whole_array(input: Sequence) -> Sequence {
    Sequence::deferred(move || {
        let input = input.clone();
        async move { vec![gather(input.to_vec().await)] }
    })
}

/// Lockstep tuples over `members`; exhausted members contribute `null`.
pub fn combine(members: Vec<Sequence>) -> Sequence {
    Sequence::zip_longest(members, |tick| {
        gather(
            tick.into_iter()
                .map(|item| item.unwrap_or(Item::Value(Value::Null)))
                .collect(),
        )
    })
}

/// Shape command output: one line as a string, otherwise a list of lines.
fn shape_lines(lines: Vec<String>) -> Item {
    let mut lines: Vec<String> = lines.into_iter().filter(|l| !l.is_empty()).collect();
    if lines.len() == 1 {
        return Item::Value(Value::String(lines.remove(0)));
    }
    Item::Value(Value::Array(lines.into_iter().map(Value::String).collect()))
}

#[derive(Clone)]
struct Command {
    template: Arc<Result<Template, ErrorValue>>,
    text: Arc<str>,
    evaluator: Arc<dyn Evaluator>,
    runner: Arc<dyn CommandRunner>,
    env: Arc<Environment>,
}

impl Command {
    async fn run(&self, bindings: Bindings) -> Item {
        let template = match self.template.as_ref() {
            Ok(template) => template,
            Err(error) => return Item::Error(error.clone()),
        };
        let command = match template
            .render(self.evaluator.as_ref(), &bindings, &self.env)
            .await
        {
            Ok(command) => command,
            Err(cause) => return Item::error(template_message(&self.text), cause),
        };
        tracing::trace!(%command, "running command");
        match self.runner.run(&command).await {
            Ok(lines) => shape_lines(lines),
            Err(cause) => {
                tracing::trace!(%command, %cause, "command failed");
                Item::error(command_message(&self.text), cause)
            }
        }
    }
}

/// Run a command template once, or once per item with `{value, index}`.
///
/// A quoted expression runs verbatim. Each run yields one item.
pub fn shell(
    input: Option<&Sequence>,
    expression: &Expression,
    evaluator: Arc<dyn Evaluator>,
    runner: Arc<dyn CommandRunner>,
    env: Arc<Environment>,
) -> Sequence {
    let text = expression.text();
    let template = match expression {
        Expression::Quoted(_) => Ok(Template::verbatim(text.clone())),
        Expression::Source(source) => Template::parse(source)
            .map_err(|cause| ErrorValue::new(template_message(source), cause)),
    };
    let command = Command {
        template: Arc::new(template),
        text: text.into(),
        evaluator,
        runner,
        env,
    };

    match input {
        Some(input) => input.map(move |item, index| {
            let command = command.clone();
            async move { command.run(Bindings::for_item(item, index)).await }
        }),
        None => Sequence::deferred(move || {
            let command = command.clone();
            async move { vec![command.run(Bindings::new()).await] }
        }),
    }
}

/// Replace error items with `f` evaluated on `{error, index}`.
pub fn error_handler(input: &Sequence, f: Prepared) -> Sequence {
    input.map(move |item, index| {
        let f = f.clone();
        async move {
            if item.is_error() {
                f.call(Bindings::for_error(item, index)).await
            } else {
                item
            }
        }
    })
}

/// Keep items whose predicate is truthy.
pub fn filter(input: &Sequence, f: Prepared) -> Sequence {
    input.filter(move |item, index| {
        let f = f.clone();
        async move { f.call(Bindings::for_item(item, index)).await.is_truthy() }
    })
}

/// Evaluate per item and flatten list results one level.
pub fn flat_map(input: &Sequence, f: Prepared) -> Sequence {
    input.flat_map(move |item, index| {
        let f = f.clone();
        async move { expand(f.call(Bindings::for_item(item, index)).await) }
    })
}

/// Fold into a single item, evaluating `seed` once per run.
pub fn reduce(input: Sequence, f: Prepared, seed: Prepared) -> Sequence {
    Sequence::deferred(move || {
        let input = input.clone();
        let f = f.clone();
        let seed = seed.clone();
        async move {
            let initial = seed.call(Bindings::new()).await;
            let result = input
                .reduce(initial, |acc, item, index| {
                    let f = f.clone();
                    async move { f.call(Bindings::for_fold(acc, item, index)).await }
                })
                .await;
            vec![result]
        }
    })
}

/// Yield items until the predicate evaluates to exactly `true`.
pub fn terminate(input: &Sequence, f: Prepared) -> Sequence {
    input.take_until(move |item, index| {
        let f = f.clone();
        async move { f.call(Bindings::for_item(item, index)).await.is_true() }
    })
}

/// Deliver `f` of each item to `sink`, then re-emit the item unchanged.
pub fn tap(input: &Sequence, f: Prepared, sink: Arc<dyn Sink>) -> Sequence {
    input.map(move |item, index| {
        let f = f.clone();
        let sink = Arc::clone(&sink);
        async move {
            let output = f.call(Bindings::for_item(item.clone(), index)).await;
            sink.accept(output);
            item
        }
    })
}

// =============================================================================
// TESTS
// =============================================================================
