//! # Pipeline State
//!
//! The bundle threaded through the interpreter loop:
//! - The current sequence (absent until the first producing stage)
//! - The named-sequence registry (append-only for the run)
//! - The positional result stack
//! - The stacking-enabled and must-print flags
//! - The import environment
//!
//! Every operation consumes the state and returns the next one. Nothing is
//! shared between steps, so there is no state to mutate behind a stage's back.

use crate::{BashoError, Environment, Sequence};
use std::sync::Arc;

/// A sequence registered under a name.
#[derive(Debug, Clone)]
pub struct NamedSequence {
    /// The registered name, unique for the run.
    pub name: String,
    /// The sequence as it was when named.
    pub sequence: Sequence,
}

/// What the interpreter hands back to its caller.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Whether the caller should print the sequence.
    pub must_print: bool,
    /// The final sequence. Empty if no stage produced one.
    pub sequence: Sequence,
}

/// State between two interpretation steps.
#[derive(Debug, Clone)]
pub struct PipelineState {
    sequence: Option<Sequence>,
    registry: Vec<NamedSequence>,
    stack: Vec<Sequence>,
    stacking_enabled: bool,
    must_print: bool,
    env: Arc<Environment>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PipelineState {
    /// Initial state: optional input, empty registry and stack, both flags on.
    #[must_use]
    pub fn new(initial: Option<Sequence>) -> Self {
        Self {
            sequence: initial,
            registry: Vec::new(),
            stack: Vec::new(),
            stacking_enabled: true,
            must_print: true,
            env: Arc::new(Environment::new()),
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The current sequence, if any stage has produced one.
    #[must_use]
    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    /// The current sequence, or an empty one.
    #[must_use]
    pub fn input(&self) -> Sequence {
        self.sequence.clone().unwrap_or_else(Sequence::empty)
    }

    /// Registered names, oldest first.
    #[must_use]
    pub fn registry(&self) -> &[NamedSequence] {
        &self.registry
    }

    /// Stack entries, oldest first.
    #[must_use]
    pub fn stack(&self) -> &[Sequence] {
        &self.stack
    }

    /// Whether produced sequences are pushed onto the stack.
    #[must_use]
    pub fn stacking_enabled(&self) -> bool {
        self.stacking_enabled
    }

    /// Whether the caller should print the final sequence.
    #[must_use]
    pub fn must_print(&self) -> bool {
        self.must_print
    }

    /// The import environment for stages built from here on.
    #[must_use]
    pub fn environment(&self) -> &Arc<Environment> {
        &self.env
    }

    /// Look up a registered name.
    pub fn lookup(&self, name: &str) -> Result<&Sequence, BashoError> {
        self.registry
            .iter()
            .find(|n| n.name == name)
            .map(|n| &n.sequence)
            .ok_or_else(|| BashoError::UnknownName {
                name: name.to_string(),
            })
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Make `sequence` current, pushing it onto the stack if stacking is on.
    #[must_use]
    pub fn advance(mut self, sequence: Sequence) -> Self {
        if self.stacking_enabled {
            self.stack.push(sequence.clone());
        }
        self.sequence = Some(sequence);
        self
    }

    /// Register the current sequence under `name`.
    ///
    /// With no current sequence, an empty one is registered.
    pub fn name(mut self, name: &str) -> Result<Self, BashoError> {
        if self.registry.iter().any(|n| n.name == name) {
            return Err(BashoError::Naming {
                name: name.to_string(),
            });
        }
        if let Some(current) = &self.sequence
            && let Some(existing) = self.registry.iter().find(|n| n.sequence.same(current))
        {
            return Err(BashoError::AlreadyNamed {
                name: existing.name.clone(),
            });
        }
        let sequence = self.input();
        self.registry.push(NamedSequence {
            name: name.to_string(),
            sequence,
        });
        Ok(self)
    }

    /// Resume from the sequence registered under `name`.
    pub fn seek(self, name: &str) -> Result<Self, BashoError> {
        let sequence = self.lookup(name)?.fresh_handle();
        Ok(self.advance(sequence))
    }

    /// Resume from the stack entry `index` positions from the end.
    pub fn stack_ref(self, index: usize) -> Result<Self, BashoError> {
        let depth = self.stack.len();
        let sequence = index
            .checked_add(1)
            .and_then(|back| depth.checked_sub(back))
            .and_then(|pos| self.stack.get(pos))
            .map(Sequence::fresh_handle)
            .ok_or(BashoError::StackIndexOutOfRange { index, depth })?;
        Ok(self.advance(sequence))
    }

    /// Pop the last stack entry and resume from the one before it.
    pub fn drop_last(mut self) -> Result<Self, BashoError> {
        let depth = self.stack.len();
        if depth < 2 {
            return Err(BashoError::StackUnderflow { depth });
        }
        self.stack.pop();
        self.sequence = self.stack.last().cloned();
        Ok(self)
    }

    /// Stop pushing onto the stack. Existing entries stay.
    #[must_use]
    pub fn disable_stacking(mut self) -> Self {
        self.stacking_enabled = false;
        self
    }

    /// Clear the must-print flag.
    #[must_use]
    pub fn suppress_print(mut self) -> Self {
        self.must_print = false;
        self
    }

    /// Replace the import environment for later stages.
    #[must_use]
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// End the run.
    #[must_use]
    pub fn finish(self) -> PipelineOutput {
        PipelineOutput {
            must_print: self.must_print,
            sequence: self.sequence.unwrap_or_else(Sequence::empty),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
