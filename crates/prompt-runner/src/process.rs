use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

// ─── ProcessRunner ────────────────────────────────────────────────────────

/// Raw outcome of one external model CLI run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Capability interface for running a prompt against one named model.
///
/// The session controller only ever sees this trait, so tests drive it
/// with scripted fakes instead of real subprocesses.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `prompt` against `model`. An `Err` means the process could not
    /// be started at all; a non-zero `exit_code` is a normal outcome.
    async fn run(&self, model: &str, prompt: &str) -> std::io::Result<ProcessOutcome>;
}

// ─── CliProcessRunner ─────────────────────────────────────────────────────

/// Spawns the real model CLI (`gemini -m <model>` by default), feeds the
/// prompt on stdin, and mirrors both output streams live to the parent
/// console while buffering them for classification.
#[derive(Debug, Clone)]
pub struct CliProcessRunner {
    executable: String,
    extra_args: Vec<String>,
}

impl Default for CliProcessRunner {
    fn default() -> Self {
        Self {
            executable: "gemini".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl CliProcessRunner {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }
}

#[async_trait]
impl ProcessRunner for CliProcessRunner {
    async fn run(&self, model: &str, prompt: &str) -> std::io::Result<ProcessOutcome> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-m").arg(model).args(&self.extra_args);
        run_command(cmd, prompt).await
    }
}

/// Shared subprocess plumbing: piped stdio, prompt over stdin, one drain
/// task per output stream. Each drained line is written through to the
/// parent console and appended to an in-memory buffer — single producer
/// fanned out to two sinks, no locking beyond the buffer itself.
///
/// The drain tasks must be running before the prompt is fed: a prompt
/// larger than the OS pipe buffer, written against a child that has
/// already filled its own output pipe, blocks both sides forever.
async fn run_command(mut cmd: Command, prompt: &str) -> std::io::Result<ProcessOutcome> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;

    let stdout_buf = Arc::new(Mutex::new(String::new()));
    let stderr_buf = Arc::new(Mutex::new(String::new()));

    let stdout_task = child.stdout.take().map(|out| {
        let buf = Arc::clone(&stdout_buf);
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{line}");
                append_line(&buf, &line);
            }
        })
    });

    let stderr_task = child.stderr.take().map(|err| {
        let buf = Arc::clone(&stderr_buf);
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{line}");
                append_line(&buf, &line);
            }
        })
    });

    // Feed the prompt concurrently with the drains. A child that exits
    // before consuming its input (e.g. an immediate quota rejection)
    // breaks the pipe; the attempt is classified from its exit code and
    // stderr, not from this write, so write errors are ignored.
    let stdin_task = child.stdin.take().map(|mut stdin| {
        let prompt = prompt.to_string();
        tokio::spawn(async move {
            let _ = stdin.write_all(prompt.as_bytes()).await;
            let _ = stdin.flush().await;
            // Dropping stdin closes it, signalling end of input.
        })
    });

    let status = child.wait().await?;

    if let Some(task) = stdin_task {
        let _ = task.await;
    }

    // Drain tasks finish on their stream's EOF; wait so the buffers are
    // complete before we read them.
    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }

    let stdout = stdout_buf.lock().map(|b| b.clone()).unwrap_or_default();
    let stderr = stderr_buf.lock().map(|b| b.clone()).unwrap_or_default();

    Ok(ProcessOutcome {
        // Killed-by-signal has no code; classify as a generic failure.
        exit_code: status.code().unwrap_or(1),
        stdout,
        stderr,
    })
}

fn append_line(buf: &Arc<Mutex<String>>, line: &str) {
    if let Ok(mut b) = buf.lock() {
        if !b.is_empty() {
            b.push('\n');
        }
        b.push_str(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let outcome = run_command(sh("echo OK"), "").await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "OK");
        assert_eq!(outcome.stderr, "");
    }

    #[tokio::test]
    async fn captures_stderr_separately() {
        let outcome = run_command(sh("echo out; echo err >&2; exit 3"), "")
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stdout, "out");
        assert_eq!(outcome.stderr, "err");
    }

    #[tokio::test]
    async fn prompt_is_fed_on_stdin() {
        let outcome = run_command(sh("cat"), "the rendered prompt").await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "the rendered prompt");
    }

    #[tokio::test]
    async fn multiline_output_is_buffered_in_order() {
        let outcome = run_command(sh("printf 'a\\nb\\nc\\n'"), "").await.unwrap();
        assert_eq!(outcome.stdout, "a\nb\nc");
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let cmd = Command::new("definitely-not-a-real-binary-5c1a");
        assert!(run_command(cmd, "").await.is_err());
    }

    #[tokio::test]
    async fn large_prompt_does_not_deadlock_against_early_output() {
        // Child fills its stdout pipe past the OS buffer before touching
        // stdin, while we feed a prompt that also exceeds the buffer —
        // the directory-packing case. Both pipes must move concurrently.
        let prompt = "a".repeat(256 * 1024);
        let cmd = sh("head -c 262144 /dev/zero | tr '\\0' 'b'; cat >/dev/null");
        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            run_command(cmd, &prompt),
        )
        .await
        .expect("stdin write blocked against unread stdout")
        .unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout.len(), 262144);
    }

    #[tokio::test]
    async fn early_exit_keeps_stderr_despite_broken_stdin_pipe() {
        // Child rejects immediately without reading its input. The broken
        // stdin write must not surface as a spawn error: the exit code and
        // stderr carry the classification the caller needs.
        let prompt = "a".repeat(256 * 1024);
        let outcome = run_command(sh("echo 'status 429' >&2; exit 1"), &prompt)
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.stderr.contains("429"));
    }
}
