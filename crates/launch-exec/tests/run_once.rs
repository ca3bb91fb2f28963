//! Running plans against real child processes.

#![cfg(unix)]

use launch_common::LaunchError;
use launch_descriptor::LaunchDescriptor;
use launch_exec::{run_once, LaunchPlan, RunOptions};
use std::path::Path;
use std::time::Duration;

fn plan(script: &str, args: &str, base_dir: &Path) -> LaunchPlan {
    let descriptor = LaunchDescriptor::new("test-app", script, args);
    LaunchPlan::from_descriptor(&descriptor, base_dir).unwrap()
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_clean_exit() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_once(&plan("sh", "-c true", dir.path()), &RunOptions::default()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_exit_code_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_once(&plan("sh", "-c 'exit 3'", dir.path()), &RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LaunchError::Exited { code: 3, .. }));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_relative_script_runs_from_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("env/bin");
    std::fs::create_dir_all(&bin).unwrap();

    std::os::unix::fs::symlink("/bin/sh", bin.join("python")).unwrap();
    std::fs::write(dir.path().join("marker"), "").unwrap();

    let result = run_once(
        &plan("env/bin/python", "-c '[ -f marker ]'", dir.path()),
        &RunOptions::default(),
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_environment_passed_to_child() {
    let dir = tempfile::tempdir().unwrap();
    let plan =
        plan("sh", r#"-c '[ "$APP_MODE" = test ]'"#, dir.path()).with_env("APP_MODE", "test");

    assert!(run_once(&plan, &RunOptions::default()).await.is_ok());
}

#[tokio::test]
async fn test_missing_script_not_spawned() {
    let dir = tempfile::tempdir().unwrap();
    let missing = plan("env/bin/python", "-m uvicorn a:b", dir.path());
    let err = run_once(&missing, &RunOptions::default()).await.unwrap_err();

    assert!(matches!(err, LaunchError::ScriptMissing { .. }));
}

#[tokio::test]
async fn test_unready_server_is_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let args = format!("-c 'sleep 30' --port {}", free_port());
    let options = RunOptions {
        ready_timeout: Some(Duration::from_millis(300)),
        probe_interval: Duration::from_millis(50),
        graceful_timeout: Duration::from_secs(2),
    };

    let started = std::time::Instant::now();
    let err = run_once(&plan("sh", &args, dir.path()), &options).await.unwrap_err();

    assert!(matches!(err, LaunchError::NotReady { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_ready_timeout_needs_server_target() {
    let dir = tempfile::tempdir().unwrap();
    let options = RunOptions {
        ready_timeout: Some(Duration::from_secs(1)),
        ..Default::default()
    };

    let started = std::time::Instant::now();
    let err = run_once(&plan("sh", "-eu", dir.path()), &options).await.unwrap_err();

    assert!(matches!(err, LaunchError::InvalidDescriptor { .. }));
    assert!(err.to_string().contains("server module target"));
    assert!(started.elapsed() < Duration::from_secs(1));
}
