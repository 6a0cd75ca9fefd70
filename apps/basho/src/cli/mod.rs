//! # Basho CLI Module
//!
//! Command line surface of the basho binary.
//!
//! Options come first; everything from the first pipeline token on is passed
//! to the interpreter untouched, stage markers included.
//!
//! ```bash
//! basho '[1,2,3,4]' -f 'x > 2'
//! ls | basho -j 'x.toUpperCase()'
//! basho --printerror '["a,b", 10]' -j "x.split(',')"
//! ```

mod commands;

use crate::config::BashoConfig;
use basho_core::BashoError;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// basho - shell pipelines with expressions between the pipes
///
/// Stages: -j expr, -f filter, -m flatMap, -r reduce <expr> <seed>, -e shell,
/// -a whole array, -n name, -s seek, -c combine n1,n2, --stack n, -d drop,
/// -t terminate, -l log, -w write, -i import <ref> <alias>, -q quote,
/// -p no print, --error handler, --nostack.
#[derive(Parser, Debug)]
#[command(name = "basho", about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Path to a TOML config file (defaults to $BASHO_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip error items silently and keep going
    #[arg(long)]
    pub ignoreerror: bool,

    /// Print error items and keep going
    #[arg(long)]
    pub printerror: bool,

    /// Print the version and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Pipeline tokens
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub tokens: Vec<String>,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI and return the process exit code.
pub async fn execute(cli: Cli) -> Result<i32, BashoError> {
    if cli.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(0);
    }

    let config = BashoConfig::load(cli.config.as_deref())?;
    let policy = ErrorPolicy::from_flags(
        cli.printerror || config.print_errors,
        cli.ignoreerror || config.ignore_errors,
    );

    let piped = read_piped_stdin().await?;
    let tokens = assemble_tokens(piped.as_deref(), cli.tokens);
    if tokens.is_empty() {
        Cli::command()
            .print_help()
            .map_err(|e| BashoError::Io(e.to_string()))?;
        return Ok(0);
    }

    let collaborators = default_collaborators(&config);
    let mut stdout = std::io::stdout();
    run_pipeline(collaborators, &tokens, policy, &mut stdout).await
}
