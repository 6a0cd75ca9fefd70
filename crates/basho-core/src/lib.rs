//! # basho-core
//!
//! The pipeline interpreter for basho.
//!
//! A pipeline is a flat list of tokens. Stage markers (`-j`, `-f`, `-r`, ...)
//! split it into stages, and each stage wraps the current lazy sequence in a
//! new one. Auxiliary state travels alongside: named checkpoints, a positional
//! result stack and a must-print flag.
//!
//! ## Boundaries
//!
//! The core never evaluates code, spawns processes, reads files or prints.
//! Callers supply those through [`Collaborators`]. [`ExprEvaluator`] is a
//! small deterministic evaluator for callers that need one.
//!
//! ## Errors
//!
//! - Per-item failures are [`Item::Error`] values that flow downstream
//! - Construction failures (bad names, stack indexes, imports) are
//!   [`BashoError`]s that abort the run

// =============================================================================
// MODULES
// =============================================================================

pub mod collaborators;
pub mod expr;
pub mod interpreter;
pub mod muncher;
pub mod primitives;
pub mod sequence;
pub mod stage;
pub mod state;
pub mod template;
pub mod transform;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{BashoError, Bindings, Environment, ErrorValue, Item};

// =============================================================================
// RE-EXPORTS: Interpreter
// =============================================================================

pub use interpreter::{Interpreter, run};
pub use muncher::{Expression, Munch, munch};
pub use sequence::{ItemStream, Sequence};
pub use stage::Stage;
pub use state::{NamedSequence, PipelineOutput, PipelineState};
pub use template::Template;

// =============================================================================
// RE-EXPORTS: Collaborators
// =============================================================================

pub use collaborators::{
    Collaborators, CommandRunner, Evaluator, ModuleLoader, NoCommands, NoModules, NullSink, Sink,
};
pub use expr::ExprEvaluator;
