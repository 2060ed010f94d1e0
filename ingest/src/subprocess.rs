//! Execution model for the scraper subprocess boundary (§4.3, §6): spawn,
//! stream stdout line-by-line, classify/extract JSON, and return the
//! captured payload alongside a structured outcome.

use crate::error::{IngestError, Result};
use crate::json_extract::{extract_balanced_json, try_multiline_reassembly, try_single_line};
use crate::log_line::{clean_line, is_json_candidate, parse_log_line, LogLevel};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Callback invoked for every classified scraper log line (§4.3: "a log
/// callback `(level, message) -> ()`").
pub type LogCallback<'a> = dyn Fn(LogLevel, &str) + Send + Sync + 'a;

/// How the subprocess run ended (§4.3, §7 cancellation taxonomy).
#[derive(Debug, Clone, PartialEq)]
pub enum SubprocessOutcome {
    /// The child exited 0 and a JSON payload was captured.
    Success { payload: Value },
    /// The child exited 0 but no JSON payload could be extracted.
    NoPayload,
    /// The child exited non-zero; `tail` is its last ~10 output lines.
    Failed { exit_code: Option<i32>, tail: Vec<String> },
    /// The absolute timeout elapsed; the child was killed.
    TimedOut,
    /// The cancellation token fired; the child was killed.
    Stopped,
}

const TAIL_LINES: usize = 10;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Runs `command` to completion (or until killed), returning the captured
/// payload and every classified log line. `on_log` is invoked synchronously
/// as lines are classified, in the order they were read (§4.3).
pub async fn run_subprocess(
    command: &[String],
    timeout: Duration,
    cancellation: CancellationToken,
    on_log: &LogCallback<'_>,
) -> Result<SubprocessOutcome> {
    let Some((program, args)) = command.split_first() else {
        return Ok(SubprocessOutcome::Failed { exit_code: None, tail: vec!["empty command".to_string()] });
    };

    let mut child = Command::new(program)
        .args(args)
        .env("PYTHONUNBUFFERED", "1")
        .env("PYTHONIOENCODING", "utf-8")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(IngestError::Spawn)?;

    // Merge stderr into stdout at the reader-task level rather than relying
    // on shell redirection, since `Command` gives us two independent pipes.
    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let (tx, mut rx) = mpsc::channel::<String>(256);
    let stdout_tx = tx.clone();
    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if stdout_tx.send(line).await.is_err() {
                break;
            }
        }
    });
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut output_lines: Vec<String> = Vec::new();
    let mut captured: Option<Value> = None;
    let start = std::time::Instant::now();

    let mut reader_done = false;
    loop {
        if cancellation.is_cancelled() {
            let _ = child.start_kill();
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            return Ok(SubprocessOutcome::Stopped);
        }
        if start.elapsed() > timeout {
            let _ = child.start_kill();
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            return Ok(SubprocessOutcome::TimedOut);
        }

        match tokio::time::timeout(POLL_INTERVAL, rx.recv()).await {
            Ok(Some(raw_line)) => {
                let clean = clean_line(&raw_line);
                output_lines.push(clean.clone());

                if captured.is_none() && is_json_candidate(&clean) {
                    if let Some(value) = try_single_line(&clean) {
                        captured = Some(value);
                        continue;
                    }
                    if let Some(value) = try_multiline_reassembly(&output_lines) {
                        captured = Some(value);
                        continue;
                    }
                    // Might still be a log line that happens to start with
                    // `[`/`{` (e.g. a `[ERROR] ...` tag) — fall through to
                    // logging it, matching the reference bridge.
                }
                if clean.len() > 3 {
                    let (level, message) = parse_log_line(&clean);
                    on_log(level, &message);
                }
            }
            Ok(None) => {
                reader_done = true;
            }
            Err(_elapsed) => {}
        }

        if reader_done && child.try_wait().map(|status| status.is_some()).unwrap_or(false) {
            break;
        }
    }

    let status = child.wait().await.map_err(IngestError::Spawn)?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if !status.success() {
        let tail = output_lines[output_lines.len().saturating_sub(TAIL_LINES)..].to_vec();
        return Ok(SubprocessOutcome::Failed { exit_code: status.code(), tail });
    }

    if captured.is_none() {
        captured = extract_balanced_json(&output_lines.join("\n"));
    }

    match captured {
        Some(payload) => Ok(SubprocessOutcome::Success { payload }),
        None => Ok(SubprocessOutcome::NoPayload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_command(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_a_single_line_json_payload() {
        let command = shell_command(r#"echo '{"matches": []}'"#);
        let outcome = run_subprocess(&command, Duration::from_secs(5), CancellationToken::new(), &|_, _| {})
            .await
            .unwrap();
        assert_eq!(outcome, SubprocessOutcome::Success { payload: serde_json::json!({"matches": []}) });
    }

    #[tokio::test]
    async fn captures_json_printed_after_interleaved_log_lines() {
        let script = r#"echo '[INFO] starting'; echo '[OK] done scraping'; echo '{"matches": [{"home_team": "A"}]}'"#;
        let command = shell_command(script);
        let mut logs = Vec::new();
        let outcome =
            run_subprocess(&command, Duration::from_secs(5), CancellationToken::new(), &|level, msg| {
                logs.push((level, msg.to_string()));
            })
            .await
            .unwrap();

        match outcome {
            SubprocessOutcome::Success { payload } => {
                assert_eq!(payload["matches"][0]["home_team"], "A");
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert!(logs.iter().any(|(_, msg)| msg.contains("starting")));
    }

    #[tokio::test]
    async fn a_nonzero_exit_is_reported_as_failed_with_a_tail() {
        let command = shell_command(r#"echo 'about to fail'; exit 7"#);
        let outcome = run_subprocess(&command, Duration::from_secs(5), CancellationToken::new(), &|_, _| {})
            .await
            .unwrap();
        match outcome {
            SubprocessOutcome::Failed { exit_code, tail } => {
                assert_eq!(exit_code, Some(7));
                assert!(tail.iter().any(|l| l.contains("about to fail")));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_kills_the_child_and_reports_stopped() {
        let command = shell_command("sleep 30");
        let cancellation = CancellationToken::new();
        let cancel_clone = cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel_clone.cancel();
        });

        let outcome = run_subprocess(&command, Duration::from_secs(60), cancellation, &|_, _| {}).await.unwrap();
        assert_eq!(outcome, SubprocessOutcome::Stopped);
    }

    #[tokio::test]
    async fn timeout_kills_the_child_and_reports_timed_out() {
        let command = shell_command("sleep 30");
        let outcome =
            run_subprocess(&command, Duration::from_millis(200), CancellationToken::new(), &|_, _| {})
                .await
                .unwrap();
        assert_eq!(outcome, SubprocessOutcome::TimedOut);
    }
}
