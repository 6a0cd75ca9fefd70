//! # Collaborators
//!
//! The interpreter does not evaluate code, run processes, read modules or
//! print. Those jobs belong to the caller, which supplies them through the
//! traits in this module.
//!
//! Collaborators report failures as plain strings; the interpreter wraps them
//! into `ErrorValue` items or `BashoError`s with the offending text attached.

use crate::{Bindings, Environment, Item};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns expression text plus bindings into a value.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Check that `source` is well formed before any item is evaluated.
    ///
    /// A failure here turns every item of the stage into the same error.
    fn compile(&self, _source: &str) -> Result<(), String> {
        Ok(())
    }

    /// Evaluate `source` with the given bindings and import namespace.
    async fn evaluate(
        &self,
        source: &str,
        bindings: &Bindings,
        env: &Environment,
    ) -> Result<Item, String>;
}

/// Runs an external command and returns its non-empty stdout lines.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// A non-zero exit status is a failure.
    async fn run(&self, command: &str) -> Result<Vec<String>, String>;
}

/// Loads a module so its exports can be bound under an alias.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Load the module named by `reference`.
    async fn load(&self, reference: &str) -> Result<serde_json::Value, String>;
}

/// Receives side-effect output from log and write stages.
pub trait Sink: Send + Sync {
    /// Accept one value. Fire and continue.
    fn accept(&self, item: Item);
}

/// A sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn accept(&self, _item: Item) {}
}

/// A command runner for pipelines that must not touch processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCommands;

#[async_trait]
impl CommandRunner for NoCommands {
    async fn run(&self, command: &str) -> Result<Vec<String>, String> {
        Err(format!("command execution is disabled: {command}"))
    }
}

/// A module loader for pipelines that must not load modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModules;

#[async_trait]
impl ModuleLoader for NoModules {
    async fn load(&self, reference: &str) -> Result<serde_json::Value, String> {
        Err(format!("module loading is disabled: {reference}"))
    }
}

/// Everything a pipeline run needs from the outside world.
#[derive(Clone)]
pub struct Collaborators {
    /// Expression evaluator.
    pub evaluator: Arc<dyn Evaluator>,
    /// External command runner.
    pub runner: Arc<dyn CommandRunner>,
    /// Module loader for import stages.
    pub loader: Arc<dyn ModuleLoader>,
    /// Destination of log stages.
    pub log: Arc<dyn Sink>,
    /// Destination of write stages.
    pub write: Arc<dyn Sink>,
}

impl Collaborators {
    /// Collaborators with the given evaluator and inert everything else.
    #[must_use]
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            evaluator,
            runner: Arc::new(NoCommands),
            loader: Arc::new(NoModules),
            log: Arc::new(NullSink),
            write: Arc::new(NullSink),
        }
    }

    /// Replace the command runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the module loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the log sink.
    #[must_use]
    pub fn with_log(mut self, log: Arc<dyn Sink>) -> Self {
        self.log = log;
        self
    }

    /// Replace the write sink.
    #[must_use]
    pub fn with_write(mut self, write: Arc<dyn Sink>) -> Self {
        self.write = write;
        self
    }
}
