//! Tests for sandbox provisioning and wiring.

use super::*;
use crate::error::RunnerError;

const EMPTY_RUN: &str = r#"(module (func (export "run")))"#;

#[test]
fn test_runner_config_default() {
    let config = RunnerConfig::default();
    assert_eq!(config.entry_points, vec!["run", "_start"]);
    assert_eq!(config.stdout_capacity, None);
    assert_eq!(config.stderr_capacity, None);
    assert!(!config.interrupt_on_cancel);
}

#[test]
fn test_runner_config_presets() {
    assert_eq!(RunnerConfig::development().optimization_level, 0);
    assert!(RunnerConfig::interruptible().interrupt_on_cancel);
}

#[test]
fn test_runner_config_builder_chain() {
    let config = RunnerConfig::default()
        .entry_point("_start")
        .stdout_capacity(4096)
        .stderr_capacity(1024)
        .optimize(7)
        .simd(false)
        .interrupt_on_cancel(true);

    assert_eq!(config.entry_points, vec!["_start"]);
    assert_eq!(config.stdout_capacity, Some(4096));
    assert_eq!(config.stderr_capacity, Some(1024));
    assert_eq!(config.optimization_level, 2);
    assert!(!config.enable_simd);
    assert!(config.interrupt_on_cancel);
}

#[test]
fn test_runner_config_partial_json() {
    let config = RunnerConfig::from_json_str(r#"{ "entry_points": ["main"], "interrupt_on_cancel": true }"#)
        .expect("config should parse");
    assert_eq!(config.entry_points, vec!["main"]);
    assert!(config.interrupt_on_cancel);
    assert_eq!(config.stdout_capacity, None);
}

#[test]
fn test_runner_config_bad_json() {
    let err = RunnerConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)));
}

#[test]
fn test_runner_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runner.json");
    std::fs::write(&path, r#"{ "stderr_capacity": 2048 }"#).unwrap();

    let config = RunnerConfig::from_json_file(&path).unwrap();
    assert_eq!(config.stderr_capacity, Some(2048));

    let missing = RunnerConfig::from_json_file(dir.path().join("missing.json"));
    assert!(matches!(missing, Err(RunnerError::Config(_))));
}

#[test]
fn test_provision_rejects_garbage() {
    let result = Sandbox::provision(b"definitely not wasm", &RunnerConfig::default());
    assert!(matches!(result, Err(RunnerError::InvalidModule(_))));
}

#[test]
fn test_provision_rejects_truncated_binary() {
    // Magic number and version only, then a dangling section id
    let bytes = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0x01];
    let result = Sandbox::provision(&bytes, &RunnerConfig::default());
    assert!(matches!(result, Err(RunnerError::InvalidModule(_))));
}

#[test]
fn test_provision_lists_exports() {
    let wat = r#"(module (func (export "run")) (func (export "helper")) (memory (export "memory") 1))"#;
    let sandbox = Sandbox::provision(wat.as_bytes(), &RunnerConfig::default()).unwrap();
    let exports: Vec<&str> = sandbox.exports().collect();
    assert_eq!(exports, vec!["run", "helper"]);
}

#[test]
fn test_wire_resolves_default_entry() {
    let sandbox = Sandbox::provision(EMPTY_RUN.as_bytes(), &RunnerConfig::default()).unwrap();
    let wired = sandbox.wire("input").unwrap();
    assert_eq!(wired.entry_name(), "run");
    assert!(wired.interrupt_handle().is_none());
}

#[test]
fn test_wire_falls_back_to_start() {
    let wat = r#"(module (func (export "_start")))"#;
    let sandbox = Sandbox::provision(wat.as_bytes(), &RunnerConfig::default()).unwrap();
    let wired = sandbox.wire("").unwrap();
    assert_eq!(wired.entry_name(), "_start");
}

#[test]
fn test_wire_missing_entry_fails_fast() {
    let wat = r#"(module (func (export "main")))"#;
    let sandbox = Sandbox::provision(wat.as_bytes(), &RunnerConfig::default()).unwrap();
    let err = sandbox.wire("").err().unwrap();
    match err {
        RunnerError::InstantiationFailed(msg) => assert!(msg.contains("run, _start"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_wire_wrong_entry_signature() {
    let wat = r#"(module (func (export "run") (param i32)))"#;
    let config = RunnerConfig::default().entry_point("run");
    let sandbox = Sandbox::provision(wat.as_bytes(), &config).unwrap();
    assert!(matches!(
        sandbox.wire(""),
        Err(RunnerError::InstantiationFailed(_))
    ));
}

#[test]
fn test_entry_point_skips_wrong_signature() {
    let wat = r#"(module
        (func (export "run") (param i32))
        (func (export "_start")))"#;
    let sandbox = Sandbox::provision(wat.as_bytes(), &RunnerConfig::default()).unwrap();
    assert_eq!(sandbox.entry_point(), Some("_start"));

    let wired = sandbox.wire("").unwrap();
    assert_eq!(wired.entry_name(), "_start");
}

#[test]
fn test_entry_point_none_when_nothing_matches() {
    let wat = r#"(module
        (func (export "run") (result i32) i32.const 0)
        (global (export "_start") i32 (i32.const 0)))"#;
    let sandbox = Sandbox::provision(wat.as_bytes(), &RunnerConfig::default()).unwrap();
    assert_eq!(sandbox.entry_point(), None);

    let config = RunnerConfig::default().entry_point("main");
    let sandbox = Sandbox::provision(EMPTY_RUN.as_bytes(), &config).unwrap();
    assert_eq!(sandbox.entry_point(), None);
}

#[test]
fn test_wire_missing_host_import() {
    let wat = r#"(module
        (import "env" "host_secret" (func $secret))
        (func (export "run") call $secret))"#;
    let sandbox = Sandbox::provision(wat.as_bytes(), &RunnerConfig::default()).unwrap();
    assert!(matches!(
        sandbox.wire(""),
        Err(RunnerError::InstantiationFailed(_))
    ));
}

#[test]
fn test_wire_trapping_start_function() {
    let wat = r#"(module (func $boom unreachable) (start $boom) (func (export "run")))"#;
    let sandbox = Sandbox::provision(wat.as_bytes(), &RunnerConfig::default()).unwrap();
    assert!(matches!(
        sandbox.wire(""),
        Err(RunnerError::InstantiationFailed(_))
    ));
}

#[test]
fn test_wire_zero_capacity_is_io_error() {
    let config = RunnerConfig::default().stdout_capacity(0);
    let sandbox = Sandbox::provision(EMPTY_RUN.as_bytes(), &config).unwrap();
    assert!(matches!(sandbox.wire(""), Err(RunnerError::Io(_))));
}

#[test]
fn test_interruptible_wiring_exposes_handle() {
    let sandbox = Sandbox::provision(EMPTY_RUN.as_bytes(), &RunnerConfig::interruptible()).unwrap();
    let wired = sandbox.wire("").unwrap();
    assert!(wired.interrupt_handle().is_some());
    assert_eq!(wired.run_to_completion(), ExecutionOutcome::Success(String::new()));
}

#[test]
fn test_run_to_completion_unreachable_traps() {
    let wat = r#"(module (func (export "run") unreachable))"#;
    let sandbox = Sandbox::provision(wat.as_bytes(), &RunnerConfig::default()).unwrap();
    let outcome = sandbox.wire("").unwrap().run_to_completion();
    match outcome {
        ExecutionOutcome::Failure(GuestFailure::Trap(msg)) => {
            assert!(msg.contains("unreachable"), "{}", msg)
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_setup_error_classification() {
    assert!(RunnerError::InvalidModule(String::new()).is_setup_error());
    assert!(RunnerError::InstantiationFailed(String::new()).is_setup_error());
    assert!(!RunnerError::Cancelled.is_setup_error());
    assert!(!RunnerError::GuestTrap(String::new()).is_setup_error());
}
