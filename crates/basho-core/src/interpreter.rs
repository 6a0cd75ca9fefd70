//! # Interpreter
//!
//! Drives a token list to completion:
//!
//! 1. Dispatch on the next token to get a stage and the tokens it consumed
//! 2. Apply the stage to the current state, producing the next state
//! 3. Repeat until no tokens remain, then hand back `{must_print, sequence}`
//!
//! The loop is iterative, so pipeline length is bounded only by memory.
//! Construction-time errors stop the loop immediately; nothing is evaluated
//! before the caller pulls from the returned sequence.

use crate::collaborators::Collaborators;
use crate::muncher::Expression;
use crate::stage::Stage;
use crate::state::{PipelineOutput, PipelineState};
use crate::transform::{self, Prepared};
use crate::{BashoError, Sequence};
use std::sync::Arc;

/// Runs pipelines against a fixed set of collaborators.
#[derive(Clone)]
pub struct Interpreter {
    collaborators: Collaborators,
}

impl Interpreter {
    /// Create an interpreter.
    #[must_use]
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// The collaborators stages are built with.
    #[must_use]
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Interpret `tokens`, optionally starting from an existing sequence.
    pub async fn run(
        &self,
        tokens: &[String],
        initial: Option<Sequence>,
    ) -> Result<PipelineOutput, BashoError> {
        let mut state = PipelineState::new(initial);
        let mut rest = tokens;

        while !rest.is_empty() {
            let (stage, consumed) = Stage::parse(rest)?;
            tracing::debug!(
                stage = stage.kind(),
                consumed,
                depth = state.stack().len(),
                "dispatching stage"
            );
            state = self.apply(stage, state).await?;
            rest = rest.get(consumed..).unwrap_or_default();
        }

        Ok(state.finish())
    }

    /// Apply one stage to the state.
    pub async fn apply(
        &self,
        stage: Stage,
        state: PipelineState,
    ) -> Result<PipelineState, BashoError> {
        let next = match stage {
            Stage::Name(name) => return state.name(&name),
            Stage::Seek(name) => return state.seek(&name),
            Stage::StackRef(index) => return state.stack_ref(index),
            Stage::Drop => return state.drop_last(),
            Stage::DisableStacking => return Ok(state.disable_stacking()),
            Stage::SuppressPrint => return Ok(state.suppress_print()),
            Stage::Import { reference, alias } => {
                let exports = self
                    .collaborators
                    .loader
                    .load(&reference)
                    .await
                    .map_err(|cause| BashoError::Import {
                        reference: reference.clone(),
                        cause,
                    })?;
                tracing::debug!(%reference, %alias, "module imported");
                let env = state.environment().with_alias(alias, exports);
                let state = state.with_environment(env);
                return Ok(match state.sequence().cloned() {
                    Some(current) => state.advance(current),
                    None => state,
                });
            }
            Stage::Evaluate(expression) => {
                transform::evaluate(state.sequence(), self.prepare(&expression, &state))
            }
            Stage::Shell(expression) => transform::shell(
                state.sequence(),
                &expression,
                Arc::clone(&self.collaborators.evaluator),
                Arc::clone(&self.collaborators.runner),
                Arc::clone(state.environment()),
            ),
            Stage::WholeArray => transform::whole_array(state.input()),
            Stage::Combine(names) => {
                let members = names
                    .iter()
                    .map(|name| state.lookup(name).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                transform::combine(members)
            }
            Stage::ErrorHandler(expression) => {
                transform::error_handler(&state.input(), self.prepare(&expression, &state))
            }
            Stage::Filter(expression) => {
                transform::filter(&state.input(), self.prepare(&expression, &state))
            }
            Stage::FlatMap(expression) => {
                transform::flat_map(&state.input(), self.prepare(&expression, &state))
            }
            Stage::Reduce { expression, seed } => transform::reduce(
                state.input(),
                self.prepare(&expression, &state),
                self.prepare(&seed, &state),
            ),
            Stage::Terminate(expression) => {
                transform::terminate(&state.input(), self.prepare(&expression, &state))
            }
            Stage::Log(expression) => transform::tap(
                &state.input(),
                self.prepare(&expression, &state),
                Arc::clone(&self.collaborators.log),
            ),
            Stage::Write(expression) => transform::tap(
                &state.input(),
                self.prepare(&expression, &state),
                Arc::clone(&self.collaborators.write),
            ),
        };

        Ok(state.advance(next))
    }

    fn prepare(&self, expression: &Expression, state: &PipelineState) -> Prepared {
        Prepared::new(
            expression,
            Arc::clone(&self.collaborators.evaluator),
            Arc::clone(state.environment()),
        )
    }
}

/// Interpret `tokens` from scratch with the given collaborators.
pub async fn run(
    collaborators: Collaborators,
    tokens: &[String],
) -> Result<PipelineOutput, BashoError> {
    Interpreter::new(collaborators).run(tokens, None).await
}

// =============================================================================
// TESTS
// =============================================================================
