// ABOUTME: Integration tests for the SSH module against a real server.
// ABOUTME: Tests run against a shared OpenSSH container and need a Docker daemon.

mod support;

use sshrun::ssh::{
    BatchOptions, Error, ExitStatus, JoinPolicy, StreamOptions, Transport, start_session,
};
use std::time::Duration;
use support::ssh_container::shared_container;
use tokio_util::sync::CancellationToken;

/// Test: Batch of commands runs in order in one shell.
/// Expected: Output of both commands, in order.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn run_commands_captures_output_in_order() {
    support::init_tracing();
    let container = shared_container().await;

    let transport = Transport::connect(container.params())
        .await
        .expect("connection should succeed");
    let session = transport.open_session().await.expect("session should open");

    let output = session
        .run_commands(&["echo first", "echo second"], &BatchOptions::default())
        .await
        .expect("batch should succeed");

    let text = String::from_utf8_lossy(&output);
    let first = text.find("first").expect("first output present");
    let second = text.find("second").expect("second output present");
    assert!(first < second, "output out of order: {:?}", text);

    transport
        .disconnect()
        .await
        .expect("disconnect should succeed");
}

/// Test: Batch whose last command fails.
/// Expected: CommandFailed carrying the remote exit code.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn failing_batch_reports_exit_code() {
    let container = shared_container().await;
    let transport = Transport::connect(container.params()).await.unwrap();
    let session = transport.open_session().await.unwrap();

    let err = session
        .run_commands(&["echo partial", "exit 42"], &BatchOptions::default())
        .await
        .unwrap_err();

    match err {
        Error::CommandFailed {
            status,
            partial_output,
        } => {
            assert_eq!(status, ExitStatus::Code(42));
            assert!(String::from_utf8_lossy(&partial_output).contains("partial"));
        }
        other => panic!("expected CommandFailed, got: {:?}", other),
    }

    transport.disconnect().await.unwrap();
}

/// Test: Sequential join keeps going after a failure, AndThen stops.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn join_policy_controls_short_circuit() {
    let container = shared_container().await;
    let transport = Transport::connect(container.params()).await.unwrap();

    let output = transport
        .open_session()
        .await
        .unwrap()
        .run_commands(&["false", "echo after"], &BatchOptions::default())
        .await
        .expect("sequential batch ends with a successful command");
    assert!(String::from_utf8_lossy(&output).contains("after"));

    let err = transport
        .open_session()
        .await
        .unwrap()
        .run_commands(
            &["false", "echo after"],
            &BatchOptions::default().join(JoinPolicy::AndThen),
        )
        .await
        .unwrap_err();
    assert_eq!(err.exit_status(), Some(&ExitStatus::Code(1)));

    transport.disconnect().await.unwrap();
}

/// Test: Batch that prints nothing for longer than the keepalive window.
/// Expected: The connection stays up and the batch succeeds.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn silent_batch_outlives_idle_period() {
    let container = shared_container().await;
    let transport = Transport::connect(container.params()).await.unwrap();
    let session = transport.open_session().await.unwrap();

    let output = session
        .run_commands(&["sleep 35", "echo done"], &BatchOptions::default())
        .await
        .expect("silent batch should succeed");
    assert!(String::from_utf8_lossy(&output).contains("done"));

    // The same transport is still usable afterwards
    transport
        .open_session()
        .await
        .unwrap()
        .run_commands(&["true"], &BatchOptions::default())
        .await
        .unwrap();

    transport.disconnect().await.unwrap();
}

/// Test: Composite start_session owns its transport.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn start_session_runs_and_closes_transport() {
    let container = shared_container().await;

    let session = start_session(container.params())
        .await
        .expect("session should start");
    let output = session
        .run_commands(&["printf ok"], &BatchOptions::default())
        .await
        .unwrap();

    assert_eq!(output, b"ok");
}

/// Test: Stream forwards local input and returns when the command exits.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn stream_forwards_input_and_output() {
    let container = shared_container().await;
    let transport = Transport::connect(container.params()).await.unwrap();
    let session = transport.open_session().await.unwrap();

    let mut out = Vec::new();
    let status = tokio::time::timeout(
        Duration::from_secs(10),
        session.stream_command("head -n1", &b"hello\n"[..], &mut out, &StreamOptions::default()),
    )
    .await
    .expect("stream should finish")
    .expect("stream should succeed");

    assert!(status.success());
    assert!(String::from_utf8_lossy(&out).contains("hello"));

    transport.disconnect().await.unwrap();
}

/// Test: Stream returns after the command completes even with idle input.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn stream_returns_after_completion_with_idle_input() {
    let container = shared_container().await;
    let transport = Transport::connect(container.params()).await.unwrap();
    let session = transport.open_session().await.unwrap();
    let (input, _keep_open) = tokio::io::duplex(64);

    let status = tokio::time::timeout(
        Duration::from_secs(10),
        session.stream_command("echo done", input, tokio::io::sink(), &StreamOptions::default()),
    )
    .await
    .expect("stream must not hang on idle input")
    .unwrap();

    assert!(status.success());
    transport.disconnect().await.unwrap();
}

/// Test: Cancelling a long-running stream.
/// Expected: Cancelled error within a bounded time.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn stream_cancellation_is_prompt() {
    let container = shared_container().await;
    let transport = Transport::connect(container.params()).await.unwrap();
    let session = transport.open_session().await.unwrap();
    let (input, _keep_open) = tokio::io::duplex(64);
    let token = CancellationToken::new();
    let options = StreamOptions::default().cancel_on(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        token.cancel();
    });
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        session.stream_command("sleep 60", input, tokio::io::sink(), &options),
    )
    .await
    .expect("cancellation must end the stream");
    canceller.await.unwrap();

    assert!(matches!(result, Err(Error::Cancelled)), "got: {:?}", result);
    transport.disconnect().await.unwrap();
}

/// Test: Wrong password.
/// Expected: AuthenticationFailed.
#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn wrong_password_returns_auth_error() {
    let container = shared_container().await;

    let err = Transport::connect(container.params_with_password("wrong"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::AuthenticationFailed(_)),
        "expected AuthenticationFailed, got: {:?}",
        err
    );
}
