//! # CLI Command Implementations
//!
//! Input assembly, collaborator wiring, and printing of pipeline output.

use crate::config::BashoConfig;
use crate::loader::JsonModuleLoader;
use crate::runner::ShellRunner;
use crate::sinks;
use basho_core::{BashoError, Collaborators, ExprEvaluator, Item, run};
use futures::StreamExt;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

// =============================================================================
// ERROR POLICY
// =============================================================================

/// What to do when an error item reaches the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Print the message and stop with exit code 1.
    #[default]
    Fail,
    /// Print the message and keep going.
    Print,
    /// Skip the item and keep going.
    Ignore,
}

impl ErrorPolicy {
    /// Policy from the `--printerror` and `--ignoreerror` flags.
    ///
    /// Printing wins when both are set.
    #[must_use]
    pub fn from_flags(print: bool, ignore: bool) -> Self {
        match (print, ignore) {
            (true, _) => Self::Print,
            (false, true) => Self::Ignore,
            (false, false) => Self::Fail,
        }
    }
}

// =============================================================================
// INPUT ASSEMBLY
// =============================================================================

/// Prepend piped input lines to the argument tokens.
///
/// Each non-empty line of `piped` becomes one token.
#[must_use]
pub fn assemble_tokens(piped: Option<&str>, args: Vec<String>) -> Vec<String> {
    let mut tokens: Vec<String> = piped
        .map(|text| {
            text.lines()
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    tokens.extend(args);
    tokens
}

/// Read all of stdin when it is not a terminal.
pub async fn read_piped_stdin() -> Result<Option<String>, BashoError> {
    if std::io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .map_err(|e| BashoError::Io(format!("Failed to read stdin: {}", e)))?;
    Ok(Some(text))
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// The collaborators the binary runs with.
#[must_use]
pub fn default_collaborators(config: &BashoConfig) -> Collaborators {
    let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    Collaborators::new(Arc::new(ExprEvaluator::new()))
        .with_runner(Arc::new(ShellRunner::from_config(config)))
        .with_loader(Arc::new(JsonModuleLoader::new(base, config.max_module_size)))
        .with_log(Arc::new(sinks::stdout_log()))
        .with_write(Arc::new(sinks::stdout_write()))
}

// =============================================================================
// RUN
// =============================================================================

/// Run a pipeline and print its output to `out`.
///
/// Returns the exit code. When the pipeline asks not to be printed, the
/// output is still pulled so log and write stages run.
pub async fn run_pipeline<W: Write>(
    collaborators: Collaborators,
    tokens: &[String],
    policy: ErrorPolicy,
    out: &mut W,
) -> Result<i32, BashoError> {
    let output = run(collaborators, tokens).await?;
    tracing::debug!(must_print = output.must_print, "pipeline built");

    let io_error = |e: std::io::Error| BashoError::Io(format!("Failed to write output: {}", e));
    let mut items = output.sequence.iter();

    while let Some(item) = items.next().await {
        match item {
            Item::Error(error) => {
                tracing::debug!(cause = %error.cause, "error item reached the printer");
                match policy {
                    ErrorPolicy::Ignore => {}
                    ErrorPolicy::Print => writeln!(out, "{}", error.message).map_err(io_error)?,
                    ErrorPolicy::Fail => {
                        writeln!(out, "{}", error.message).map_err(io_error)?;
                        tracing::error!("{}", error.cause);
                        out.flush().map_err(io_error)?;
                        return Ok(1);
                    }
                }
            }
            value if output.must_print => writeln!(out, "{value}").map_err(io_error)?,
            _ => {}
        }
    }

    out.flush().map_err(io_error)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piped_lines_come_first() {
        let tokens = assemble_tokens(Some("[1,2]\n\n-j\n"), vec!["x+1".to_string()]);
        assert_eq!(tokens, vec!["[1,2]", "-j", "x+1"]);
        assert_eq!(assemble_tokens(None, Vec::new()), Vec::<String>::new());
    }

    #[test]
    fn policy_from_flags() {
        assert_eq!(ErrorPolicy::from_flags(false, false), ErrorPolicy::Fail);
        assert_eq!(ErrorPolicy::from_flags(true, false), ErrorPolicy::Print);
        assert_eq!(ErrorPolicy::from_flags(false, true), ErrorPolicy::Ignore);
        assert_eq!(ErrorPolicy::from_flags(true, true), ErrorPolicy::Print);
    }
}
