//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use basho_core::{
    Collaborators, CommandRunner, ExprEvaluator, Item, ModuleLoader, PipelineOutput, Sink, run,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Split a pipeline written on one line into tokens.
pub fn toks(line: &[&str]) -> Vec<String> {
    line.iter().map(|s| (*s).to_string()).collect()
}

/// Sink remembering everything it was given, in order.
#[derive(Default)]
pub struct RecordingSink {
    items: Mutex<Vec<Item>>,
}

impl RecordingSink {
    pub fn items(&self) -> Vec<Item> {
        self.items.lock().expect("lock").clone()
    }
}

impl Sink for RecordingSink {
    fn accept(&self, item: Item) {
        self.items.lock().expect("lock").push(item);
    }
}

/// Command runner answering from a script; unknown commands fail.
#[derive(Default)]
pub struct FakeRunner {
    script: BTreeMap<String, Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn with(mut self, command: &str, lines: &[&str]) -> Self {
        self.script
            .insert(command.to_string(), lines.iter().map(|l| (*l).to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &str) -> Result<Vec<String>, String> {
        self.calls.lock().expect("lock").push(command.to_string());
        self.script
            .get(command)
            .cloned()
            .ok_or_else(|| format!("sh: {command}: command not found"))
    }
}

/// Module loader serving fixed exports by reference.
#[derive(Default)]
pub struct FakeLoader {
    modules: BTreeMap<String, Value>,
}

impl FakeLoader {
    pub fn with(mut self, reference: &str, exports: Value) -> Self {
        self.modules.insert(reference.to_string(), exports);
        self
    }
}

#[async_trait]
impl ModuleLoader for FakeLoader {
    async fn load(&self, reference: &str) -> Result<Value, String> {
        self.modules
            .get(reference)
            .cloned()
            .ok_or_else(|| format!("cannot find module '{reference}'"))
    }
}

/// Collaborators with the expression evaluator and nothing else.
pub fn plain() -> Collaborators {
    Collaborators::new(Arc::new(ExprEvaluator))
}

/// Run a pipeline and collect the whole output.
pub async fn collect(collaborators: Collaborators, line: &[&str]) -> (PipelineOutput, Vec<Item>) {
    let out = run(collaborators, &toks(line)).await.expect("pipeline builds");
    let items = out.sequence.to_vec().await;
    (out, items)
}

/// Run a pipeline with plain collaborators and return its values as JSON.
pub async fn values(line: &[&str]) -> Vec<Value> {
    let (_, items) = collect(plain(), line).await;
    items
        .into_iter()
        .map(|item| match item {
            Item::Value(v) => v,
            Item::Error(e) => serde_json::json!({ "error": e.message }),
        })
        .collect()
}
