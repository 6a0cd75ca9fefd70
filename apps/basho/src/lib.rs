//! # basho
//!
//! The basho command line program, as a library for integration tests.
//!
//! - `cli`: argument parsing, input assembly, printing and exit codes
//! - `config`: the optional TOML config file
//! - `runner`, `loader`, `sinks`: the collaborators handed to the interpreter

pub mod cli;
pub mod config;
pub mod loader;
pub mod runner;
pub mod sinks;

pub use config::BashoConfig;
pub use loader::JsonModuleLoader;
pub use runner::ShellRunner;
