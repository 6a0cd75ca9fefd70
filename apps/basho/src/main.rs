//! # basho
//!
//! Shell pipelines with expressions between the pipes.
//!
//! ```text
//!  stdin lines + args
//!          │
//!          ▼
//!  ┌───────────────┐     ┌──────────────────────────────┐
//!  │  CLI (clap)   │────▶│  basho-core interpreter      │
//!  └───────────────┘     │  shell · modules · sinks     │
//!                        └──────────────┬───────────────┘
//!                                       ▼
//!                         print items, pick exit code
//! ```
//!
//! ## Usage
//!
//! ```bash
//! basho '[1,2,3,4]' -f 'x > 2'
//! basho -e 'ls' -j 'x.length'
//! ```

use basho::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // BASHO_LOG_FORMAT=json enables machine-parseable output. Logs go to stderr,
    // stdout carries the pipeline.
    let log_format = std::env::var("BASHO_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "basho=warn,basho_core=warn".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    match cli::execute(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
