//! Container-backed exec tests.
//!
//! These need a reachable Docker daemon and a pullable `alpine` image, so
//! they are ignored by default: `cargo test -p cordon-sandbox -- --ignored`.

use bollard::Docker;
use cordon_protocol::Encoding;
use cordon_sandbox::{ExecOptions, Sandbox, SandboxConfig};
use tempfile::TempDir;

fn docker() -> Docker {
    Docker::connect_with_local_defaults().expect("docker daemon reachable")
}

fn config(base: &TempDir) -> SandboxConfig {
    SandboxConfig::new("itest", base.path()).with_image("alpine:3.20")
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn exec_captures_stdout_and_exit_code() {
    let base = TempDir::new().unwrap();
    let sandbox = Sandbox::create(docker(), config(&base)).await.unwrap();

    let result = sandbox.exec("echo hello", ExecOptions::default()).await;
    assert!(result.success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout.trim(), "hello");

    sandbox.destroy().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn exec_sees_bind_mounted_files() {
    let base = TempDir::new().unwrap();
    let sandbox = Sandbox::create(docker(), config(&base)).await.unwrap();

    let write = sandbox
        .create_file("a.txt", "hello", Encoding::Utf8, false)
        .await;
    assert!(write.success);

    let result = sandbox.exec("cat a.txt", ExecOptions::default()).await;
    assert!(result.success);
    assert_eq!(result.stdout, "hello");

    sandbox.destroy().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn exec_timeout_kills_and_reports_124() {
    let base = TempDir::new().unwrap();
    let sandbox = Sandbox::create(docker(), config(&base)).await.unwrap();

    let result = sandbox
        .exec(
            "sleep 10",
            ExecOptions {
                timeout_ms: Some(2_000),
                ..ExecOptions::default()
            },
        )
        .await;
    assert!(!result.success);
    assert!(result.timed_out);
    assert_eq!(result.exit_code, 124);
    // Measured wall-clock, not the timeout constant; allow scheduling slack.
    assert!(result.duration_ms >= 2_000 && result.duration_ms < 4_000);

    sandbox.destroy().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn destroy_is_idempotent() {
    let base = TempDir::new().unwrap();
    let sandbox = Sandbox::create(docker(), config(&base)).await.unwrap();
    sandbox.destroy().await.unwrap();
    sandbox.destroy().await.unwrap();
}
