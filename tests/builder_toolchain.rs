// tests/builder_toolchain.rs
//
// Drives the real `Builder` with small `sh` scripts standing in for the
// docs generator and the compiler.

#![cfg(unix)]

use std::fs;

use tempfile::tempdir;

use devloop::build::{Builder, DocsOutcome};
use devloop::errors::DevloopError;
use devloop::types::DocsMode;
use devloop_test_utils::builders::SettingsBuilder;
use devloop_test_utils::{init_tracing, with_timeout};

const WRITE_BINARY: &str = r#"printf '#!/bin/sh\nexec sleep 30\n' > "$0" && chmod +x "$0""#;

#[tokio::test]
async fn successful_build_stages_binary_without_touching_output() {
    init_tracing();
    let dir = tempdir().unwrap();
    let settings = SettingsBuilder::new()
        .build_script(WRITE_BINARY)
        .docs_mode(DocsMode::Never)
        .build(dir.path());
    fs::write(&settings.output, "old").unwrap();

    let builder = Builder::new(&settings);
    let result = with_timeout(builder.build(&settings.root, &settings.output)).await;

    assert!(result.success, "{:?}", result.diagnostics);
    let staged = result.artifact.clone().unwrap();
    assert_eq!(staged, settings.staged_output());
    assert!(staged.is_file());
    assert_eq!(fs::read_to_string(&settings.output).unwrap(), "old");

    builder.install(&staged, &settings.output).unwrap();
    assert!(!staged.exists());
    assert!(fs::read_to_string(&settings.output).unwrap().contains("sleep 30"));
}

#[tokio::test]
async fn failed_build_reports_diagnostics_and_leaves_output_alone() {
    init_tracing();
    let dir = tempdir().unwrap();
    let settings = SettingsBuilder::new()
        .build_script(r#"touch "$0"; echo './main.go:3:2: undefined: nope' >&2; exit 2"#)
        .docs_mode(DocsMode::Never)
        .build(dir.path());
    fs::write(&settings.output, "old").unwrap();

    let builder = Builder::new(&settings);
    let result = with_timeout(builder.build(&settings.root, &settings.output)).await;

    assert!(!result.success);
    assert!(result.artifact.is_none());
    match result.to_error() {
        Some(DevloopError::BuildError(msg)) => assert!(msg.contains("undefined: nope")),
        other => panic!("expected BuildError, got {:?}", other),
    }
    assert!(!settings.staged_output().exists());
    assert_eq!(fs::read_to_string(&settings.output).unwrap(), "old");
}

#[tokio::test]
async fn success_without_binary_is_a_failure() {
    init_tracing();
    let dir = tempdir().unwrap();
    let settings = SettingsBuilder::new()
        .build_cmd(&["true"])
        .docs_mode(DocsMode::Never)
        .build(dir.path());

    let builder = Builder::new(&settings);
    let result = with_timeout(builder.build(&settings.root, &settings.output)).await;

    assert!(!result.success);
    assert!(result.diagnostics.unwrap().contains("no binary"));
}

#[tokio::test]
async fn hung_toolchain_hits_build_timeout() {
    init_tracing();
    let dir = tempdir().unwrap();
    let settings = SettingsBuilder::new()
        .build_cmd(&["sleep", "30"])
        .build_timeout("200ms")
        .docs_mode(DocsMode::Never)
        .build(dir.path());

    let builder = Builder::new(&settings);
    let result = with_timeout(builder.build(&settings.root, &settings.output)).await;

    assert!(!result.success);
    assert!(result.diagnostics.unwrap().contains("timed out"));
}

#[tokio::test]
async fn docs_generated_once_when_missing() {
    init_tracing();
    let dir = tempdir().unwrap();
    let settings = SettingsBuilder::new()
        .docs_cmd(&["sh", "-c", "mkdir -p docs && echo '{}' > docs/swagger.json"])
        .build(dir.path());
    assert_eq!(settings.docs.mode, DocsMode::IfMissing);

    let builder = Builder::new(&settings);
    let first = with_timeout(builder.ensure_docs(&settings.root)).await.unwrap();
    let second = with_timeout(builder.ensure_docs(&settings.root)).await.unwrap();

    assert_eq!(first, DocsOutcome::Generated);
    assert_eq!(second, DocsOutcome::Skipped);
    assert!(settings.docs.artifact.is_file());
}

#[tokio::test]
async fn failing_docs_generator_is_docgen_error() {
    init_tracing();
    let dir = tempdir().unwrap();
    let settings = SettingsBuilder::new()
        .docs_mode(DocsMode::Always)
        .docs_cmd(&["sh", "-c", "echo 'swag: cannot parse' >&2; exit 1"])
        .build(dir.path());

    let builder = Builder::new(&settings);
    match with_timeout(builder.ensure_docs(&settings.root)).await {
        Err(DevloopError::DocGenError(msg)) => assert!(msg.contains("cannot parse")),
        other => panic!("expected DocGenError, got {:?}", other),
    }
}
