//! # Stage Markers
//!
//! Hardcoded tokens that begin a pipeline stage.
//!
//! Any token in [`STAGE_MARKERS`] ends the expression currently being munched.
//! Everything else is expression text.

/// Treat the whole sequence as a single array.
pub const WHOLE_ARRAY: &str = "-a";
/// Combine named results: `-c n1,n2,n3`.
pub const COMBINE: &str = "-c";
/// Remove the previous result from the pipeline.
pub const DROP: &str = "-d";
/// Run a shell command.
pub const SHELL: &str = "-e";
/// Rewrite error items.
pub const ERROR_HANDLER: &str = "--error";
/// Filter items.
pub const FILTER: &str = "-f";
/// Import a module under an alias: `-i <ref> <alias>`.
pub const IMPORT: &str = "-i";
/// Evaluate an expression per item.
pub const EXPRESSION: &str = "-j";
/// Evaluate and log a value per item.
pub const LOG: &str = "-l";
/// Flat-map items.
pub const FLAT_MAP: &str = "-m";
/// Name the current result: `-n <name>`.
pub const NAME: &str = "-n";
/// Quote the following tokens as a string.
pub const QUOTE: &str = "-q";
/// Clear the must-print flag.
pub const SUPPRESS_PRINT: &str = "-p";
/// Reduce: `-r <expr> <seed>`.
pub const REDUCE: &str = "-r";
/// Seek a named result: `-s <name>`.
pub const SEEK: &str = "-s";
/// Stop at the first item matching a predicate.
pub const TERMINATE: &str = "-t";
/// Same as log, without the newline.
pub const WRITE: &str = "-w";
/// Use input from the result stack: `--stack <n>`.
pub const STACK_REF: &str = "--stack";
/// Disable the result stack.
pub const DISABLE_STACKING: &str = "--nostack";

/// Every token that begins a stage.
pub const STAGE_MARKERS: &[&str] = &[
    WHOLE_ARRAY,
    COMBINE,
    DROP,
    SHELL,
    FILTER,
    IMPORT,
    EXPRESSION,
    LOG,
    FLAT_MAP,
    NAME,
    QUOTE,
    SUPPRESS_PRINT,
    REDUCE,
    SEEK,
    TERMINATE,
    WRITE,
    ERROR_HANDLER,
    STACK_REF,
    DISABLE_STACKING,
];

/// Separator between names in a combine argument.
pub const COMBINE_SEPARATOR: char = ',';

/// Check whether a token begins a stage.
#[must_use]
pub fn is_marker(token: &str) -> bool {
    STAGE_MARKERS.contains(&token)
}
