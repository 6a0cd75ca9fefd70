//! # CLI Integration Tests
//!
//! The binary's collaborators and printing, exercised with real processes
//! and files.

use basho::cli::{ErrorPolicy, run_pipeline};
use basho::{BashoConfig, JsonModuleLoader, ShellRunner};
use basho_core::{BashoError, Collaborators, CommandRunner, ExprEvaluator, ModuleLoader};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

fn toks(line: &[&str]) -> Vec<String> {
    line.iter().map(|s| (*s).to_string()).collect()
}

fn collaborators() -> Collaborators {
    Collaborators::new(Arc::new(ExprEvaluator::new())).with_runner(Arc::new(ShellRunner::default()))
}

async fn printed(line: &[&str], policy: ErrorPolicy) -> (i32, String) {
    let mut out = Vec::new();
    let code = run_pipeline(collaborators(), &toks(line), policy, &mut out)
        .await
        .expect("pipeline builds");
    (code, String::from_utf8(out).expect("utf8"))
}

// =============================================================================
// SHELL RUNNER
// =============================================================================

#[tokio::test]
async fn shell_runner_returns_non_empty_lines() {
    let lines = ShellRunner::default()
        .run("printf 'a\\n\\nb\\n'")
        .await
        .expect("command runs");
    assert_eq!(lines, vec!["a", "b"]);
}

#[tokio::test]
async fn shell_runner_reports_failures() {
    let err = ShellRunner::default()
        .run("echo oops >&2; exit 3")
        .await
        .expect_err("non-zero exit");
    assert!(err.contains("exit code 3"));
    assert!(err.contains("oops"));
}

#[tokio::test]
async fn shell_stage_with_real_echo() {
    let (code, text) = printed(&["['a','b']", "-e", "echo", "${x}-${i}"], ErrorPolicy::Fail).await;
    assert_eq!(code, 0);
    assert_eq!(text, "a-0\nb-1\n");
}

// =============================================================================
// MODULE LOADER
// =============================================================================

#[tokio::test]
async fn loader_reads_relative_json_modules() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("cfg.json"), r#"{"limit": 2}"#).expect("write");

    let loader = JsonModuleLoader::new(dir.path().to_path_buf(), 1024);
    assert_eq!(
        loader.load("./cfg.json").await.expect("load"),
        json!({"limit": 2})
    );
    assert!(loader.load("./missing.json").await.is_err());
}

#[tokio::test]
async fn loader_enforces_size_and_format() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("big.json"), "[1,2,3,4,5,6,7,8,9,10]").expect("write");
    std::fs::write(dir.path().join("bad.json"), "not json").expect("write");

    let loader = JsonModuleLoader::new(dir.path().to_path_buf(), 8);
    let err = loader.load("./big.json").await.expect_err("too large");
    assert!(err.contains("exceeds maximum"));

    let loader = JsonModuleLoader::new(dir.path().to_path_buf(), 1024);
    let err = loader.load("./bad.json").await.expect_err("invalid");
    assert!(err.contains("Invalid JSON"));
    assert!(loader.load(".").await.is_err());
}

#[tokio::test]
async fn import_stage_uses_loader() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("cfg.json"), r#"{"limit": 2}"#).expect("write");
    let collaborators = collaborators().with_loader(Arc::new(JsonModuleLoader::new(
        dir.path().to_path_buf(),
        1024,
    )));

    let mut out = Vec::new();
    let code = run_pipeline(
        collaborators,
        &toks(&["[1,2,3]", "-i", "./cfg.json", "cfg", "-f", "x <= cfg.limit"]),
        ErrorPolicy::Fail,
        &mut out,
    )
    .await
    .expect("pipeline builds");
    assert_eq!(code, 0);
    assert_eq!(String::from_utf8(out).expect("utf8"), "1\n2\n");
}

// =============================================================================
// PRINTING AND ERROR POLICY
// =============================================================================

#[tokio::test]
async fn strings_print_raw_and_values_as_json() {
    let (_, text) = printed(&["['a b', [1,2], {k: 1}]"], ErrorPolicy::Fail).await;
    assert_eq!(text, "a b\n[1,2]\n{\"k\":1}\n");
}

#[tokio::test]
async fn first_error_stops_printing() {
    let (code, text) = printed(&["['a,b',10,'c']", "-j", "x.split(',')"], ErrorPolicy::Fail).await;
    assert_eq!(code, 1);
    assert_eq!(
        text,
        "[\"a\",\"b\"]\nfailed to evaluate expression: x.split(',').\n"
    );
}

#[tokio::test]
async fn printerror_continues() {
    let (code, text) = printed(&["[10,'c']", "-j", "x.split(',')"], ErrorPolicy::Print).await;
    assert_eq!(code, 0);
    assert_eq!(text, "failed to evaluate expression: x.split(',').\n[\"c\"]\n");
}

#[tokio::test]
async fn ignoreerror_skips() {
    let (code, text) = printed(&["[10,'c']", "-j", "x.split(',')"], ErrorPolicy::Ignore).await;
    assert_eq!(code, 0);
    assert_eq!(text, "[\"c\"]\n");
}

#[tokio::test]
async fn suppress_print_prints_nothing() {
    let (code, text) = printed(&["[1,2]", "-p"], ErrorPolicy::Fail).await;
    assert_eq!(code, 0);
    assert!(text.is_empty());
}

#[tokio::test]
async fn construction_errors_are_returned() {
    let mut out = Vec::new();
    let err = run_pipeline(collaborators(), &toks(&["-s", "nope"]), ErrorPolicy::Fail, &mut out)
        .await
        .expect_err("unknown name");
    assert!(matches!(err, BashoError::UnknownName { .. }));
}

// =============================================================================
// CONFIG
// =============================================================================

#[test]
fn config_file_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "shell = \"bash\"\nshell_args = [\"-c\"]\nignore_errors = true").expect("write");

    let config = BashoConfig::load(Some(file.path())).expect("load");
    assert_eq!(config.shell, "bash");
    assert!(config.ignore_errors);
    assert!(!config.print_errors);
}

#[test]
fn malformed_config_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "shell = ").expect("write");
    assert!(matches!(
        BashoConfig::load(Some(file.path())),
        Err(BashoError::Config(_))
    ));
}
