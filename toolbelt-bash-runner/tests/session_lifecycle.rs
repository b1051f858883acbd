#![cfg(unix)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use toolbelt_bash_runner::{CommandSession, OneShotOptions, SessionOptions, run_once};
use toolbelt_commons::ToolError;

fn fast_options() -> SessionOptions {
    SessionOptions::default()
        .with_poll_interval(Duration::from_millis(50))
        .with_timeout(Duration::from_secs(20))
}

fn session() -> CommandSession {
    CommandSession::new(fast_options())
}

#[tokio::test]
async fn echo_returns_stdout_without_trailing_newline() -> Result<(), ToolError> {
    let mut session = session();
    let result = session.run(Some("echo hello"), false).await?;

    assert_eq!(result.output.as_deref(), Some("hello"));
    assert_eq!(result.error, None);
    assert_eq!(result.exit_code, Some(0));
    assert!(session.is_started());

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn silent_command_still_completes() -> Result<(), ToolError> {
    let mut session = session();
    let result = session.run(Some("true"), false).await?;

    assert_eq!(result.output.as_deref(), Some(""));
    assert_eq!(result.exit_code, Some(0));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_reported_not_raised() -> Result<(), ToolError> {
    let mut session = session();
    let result = session.run(Some("false"), false).await?;
    assert_eq!(result.exit_code, Some(1));

    let result = session.run(Some("(exit 7)"), false).await?;
    assert_eq!(result.exit_code, Some(7));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn stderr_is_captured_separately() -> Result<(), ToolError> {
    let mut session = session();
    let result = session
        .run(Some("echo out; echo oops >&2"), false)
        .await?;

    assert_eq!(result.output.as_deref(), Some("out"));
    assert_eq!(result.error.as_deref(), Some("oops"));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn state_persists_between_commands() -> Result<(), ToolError> {
    let dir = TempDir::new().map_err(|e| ToolError::io("create", "tempdir", e))?;
    let mut session = session();

    session
        .run(Some(&format!("cd '{}'", dir.path().display())), false)
        .await?;
    session.run(Some("export TOOLBELT_MARK=kept"), false).await?;

    let result = session.run(Some("pwd; echo $TOOLBELT_MARK"), false).await?;
    assert_eq!(
        result.output,
        Some(format!("{}\nkept", dir.path().display()))
    );

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn output_without_final_newline_is_kept() -> Result<(), ToolError> {
    let mut session = session();
    let result = session.run(Some("printf abc"), false).await?;
    assert_eq!(result.output.as_deref(), Some("abc"));
    assert_eq!(result.exit_code, Some(0));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn working_dir_option_sets_initial_directory() -> Result<(), ToolError> {
    let dir = TempDir::new().map_err(|e| ToolError::io("create", "tempdir", e))?;
    let mut session = CommandSession::new(fast_options().with_working_dir(dir.path()));

    let result = session.run(Some("pwd"), false).await?;
    let expected = dir
        .path()
        .canonicalize()
        .map_err(|e| ToolError::io("canonicalize", dir.path(), e))?;
    assert_eq!(result.output, Some(expected.display().to_string()));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn timeout_poisons_session_until_restart() -> Result<(), ToolError> {
    let mut session = CommandSession::new(
        fast_options().with_timeout(Duration::from_secs(1)),
    );

    let error = session.run(Some("sleep 5"), false).await.err();
    assert!(matches!(error, Some(ToolError::CommandTimedOut { .. })));
    assert!(session.is_timed_out());

    let error = session.run(Some("echo again"), false).await.err();
    assert!(matches!(error, Some(ToolError::SessionTimedOut)));

    let restarted = session.run(None, true).await?;
    assert_eq!(restarted.system.as_deref(), Some("tool has been restarted."));
    assert!(!session.is_timed_out());
    assert!(!session.is_started());

    let result = session.run(Some("echo fresh"), false).await?;
    assert_eq!(result.output.as_deref(), Some("fresh"));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn restart_discards_shell_state() -> Result<(), ToolError> {
    let mut session = session();
    session.run(Some("export TOOLBELT_MARK=gone"), false).await?;
    session.run(None, true).await?;

    let result = session
        .run(Some("echo \"[${TOOLBELT_MARK:-}]\""), false)
        .await?;
    assert_eq!(result.output.as_deref(), Some("[]"));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn exiting_shell_requires_restart() -> Result<(), ToolError> {
    let mut session = session();
    let error = session.run(Some("exit 3"), false).await.err();
    assert!(matches!(error, Some(ToolError::SessionExited { .. })));

    let error = session.run(Some("echo still"), false).await.err();
    assert!(error.as_ref().is_some_and(ToolError::requires_restart));

    session.run(None, true).await?;
    let result = session.run(Some("echo back"), false).await?;
    assert_eq!(result.output.as_deref(), Some("back"));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn blank_command_is_rejected() {
    let mut session = session();
    let error = session.run(Some("   "), false).await.err();
    assert!(matches!(error, Some(ToolError::InvalidArgument(_))));
    assert!(!session.is_started());
}

#[tokio::test]
async fn stop_is_idempotent() -> Result<(), ToolError> {
    let mut session = session();
    session.stop().await;

    session.run(Some("echo up"), false).await?;
    session.stop().await;
    assert!(!session.is_started());
    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn long_output_is_clipped() -> Result<(), ToolError> {
    let mut session = CommandSession::new(fast_options().with_max_output_chars(300));
    let result = session.run(Some("seq 1 2000"), false).await?;

    let output = result.output.unwrap_or_default();
    assert!(output.starts_with("1\n2\n3\n"));
    assert!(output.contains("<response clipped:"));
    assert!(output.chars().count() < 600);
    assert_eq!(result.exit_code, Some(0));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn background_output_after_marker_is_ignored() -> Result<(), ToolError> {
    let mut session = CommandSession::new(
        SessionOptions::default()
            .with_poll_interval(Duration::from_millis(500))
            .with_timeout(Duration::from_secs(3)),
    );

    let result = session
        .run(Some("(sleep 0.1; echo late) & echo fg"), false)
        .await?;
    assert_eq!(result.output.as_deref(), Some("fg"));
    assert_eq!(result.exit_code, Some(0));
    assert!(!session.is_timed_out());

    let result = session.run(Some("wait; echo next"), false).await?;
    assert!(result.output.as_deref().is_some_and(|out| out.ends_with("next")));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn huge_output_is_bounded_and_counted() -> Result<(), ToolError> {
    let mut session = CommandSession::new(fast_options().with_max_output_chars(1_000));
    let result = session
        .run(Some("head -c 20000000 /dev/zero | tr '\\0' a"), false)
        .await?;

    let output = result.output.unwrap_or_default();
    assert!(output.starts_with(&"a".repeat(1_000)));
    assert!(output.contains("<response clipped: 19999000 characters omitted."));
    assert!(output.len() < 1_300);
    assert_eq!(result.exit_code, Some(0));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn stderr_is_complete_when_command_returns() -> Result<(), ToolError> {
    let mut session = session();
    let result = session
        .run(Some("for i in $(seq 1 500); do echo \"err $i\" >&2; done"), false)
        .await?;

    let error = result.error.unwrap_or_default();
    assert_eq!(error.lines().count(), 500);
    assert!(error.starts_with("err 1\n"));
    assert!(error.ends_with("err 500"));
    assert!(!error.contains("__TOOLBELT_DONE_"));
    assert_eq!(result.output.as_deref(), Some(""));

    let result = session.run(Some("printf oops >&2"), false).await?;
    assert_eq!(result.error.as_deref(), Some("oops"));

    session.stop().await;
    Ok(())
}

#[tokio::test]
async fn one_shot_captures_both_streams() -> Result<(), ToolError> {
    let output = run_once("echo out; echo err >&2; exit 4", &OneShotOptions::default()).await?;

    assert_eq!(output.stdout, "out\n");
    assert_eq!(output.stderr, "err\n");
    assert_eq!(output.exit_code, Some(4));
    assert!(!output.success());
    Ok(())
}

#[tokio::test]
async fn one_shot_times_out() {
    let options = OneShotOptions {
        timeout: Duration::from_millis(300),
        ..OneShotOptions::default()
    };
    let error = run_once("sleep 5", &options).await.err();
    assert!(matches!(error, Some(ToolError::CommandTimedOut { .. })));
}
