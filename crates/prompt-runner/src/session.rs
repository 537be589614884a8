//! Session controller: template location, rendering, model rotation, the
//! optional interactive loop, and guaranteed prompt-buffer cleanup.
//!
//! Per-session state machine:
//!
//! ```text
//! LOCATE → RENDER → (ATTEMPT)* → [INTERACTIVE_WAIT → ATTEMPT*]* → CLEANUP → DONE
//! ```
//!
//! A round walks the configured model list in order: the first zero exit
//! wins the round, an exhaustion failure rotates to the next model, and any
//! other failure aborts the round immediately without trying the rest. A
//! round with no winner ends the session with the fatal code (default 1).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncBufReadExt;

use reskill_core::{config, io, template};

use crate::error::{Result, RunnerError};
use crate::invoker::invoke;
use crate::process::{CliProcessRunner, ProcessRunner};

// ─── PromptRequest ────────────────────────────────────────────────────────

/// Input to one session. Immutable for the session's duration.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// Logical template identifier, resolved against the search paths.
    pub template_name: String,
    /// JSON-like variable bag handed to the renderer.
    pub variables: Map<String, Value>,
    /// Ordered model rotation, first-to-last priority.
    pub models: Vec<String>,
    /// Keep the session open for human follow-up turns after each
    /// successful round.
    pub interactive: bool,
}

impl PromptRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            variables: Map::new(),
            models: Vec::new(),
            interactive: false,
        }
    }
}

// ─── Capabilities ─────────────────────────────────────────────────────────

/// Line-based operator input for the interactive loop. Blocks without
/// timeout until the operator submits a line; `None` means end of input.
#[async_trait]
pub trait LineReader: Send + Sync {
    async fn read_line(&self, prompt: &str) -> std::io::Result<Option<String>>;
}

/// Default reader: one line from the process's own stdin.
pub struct StdinLineReader;

#[async_trait]
impl LineReader for StdinLineReader {
    async fn read_line(&self, prompt: &str) -> std::io::Result<Option<String>> {
        use std::io::Write as _;
        print!("{prompt}");
        std::io::stdout().flush()?;
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        lines.next_line().await
    }
}

/// User-facing progress reporting, injected so hosting CLIs can capture it.
/// Diagnostic detail still goes through `tracing` directly.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Default reporter: forwards to the tracing façade.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

// ─── PromptBuffer ─────────────────────────────────────────────────────────

/// Scoped handle to the on-disk rendered-prompt copy. Written once after
/// rendering for operator visibility; the `Drop` impl guarantees deletion
/// on every exit path, success or not.
struct PromptBuffer {
    path: PathBuf,
}

impl PromptBuffer {
    fn write(dir: &Path, template_name: &str, text: &str) -> Result<Self> {
        let path = io::session_buffer_path(dir, template_name);
        io::atomic_write(&path, text.as_bytes()).map_err(RunnerError::Core)?;
        tracing::debug!(path = %path.display(), "wrote rendered prompt buffer");
        Ok(Self { path })
    }
}

impl Drop for PromptBuffer {
    fn drop(&mut self) {
        io::remove_quietly(&self.path);
    }
}

// ─── Session ──────────────────────────────────────────────────────────────

/// Owns one prompt session end to end. Construct once, call [`Session::run`].
pub struct Session {
    runner: Arc<dyn ProcessRunner>,
    input: Arc<dyn LineReader>,
    reporter: Arc<dyn Reporter>,
    search_paths: Vec<PathBuf>,
    buffer_dir: PathBuf,
}

impl Session {
    /// Session with default capabilities: the real model CLI, stdin for
    /// interactive turns, tracing for progress.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            runner: Arc::new(CliProcessRunner::default()),
            input: Arc::new(StdinLineReader),
            reporter: Arc::new(TracingReporter),
            search_paths,
            buffer_dir: std::env::temp_dir(),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_input(mut self, input: Arc<dyn LineReader>) -> Self {
        self.input = input;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_buffer_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.buffer_dir = dir.into();
        self
    }

    /// Locate and render the template, then drive model rounds until one
    /// terminal outcome. Returns the last successful round's output, or
    /// [`RunnerError::SessionFailed`] carrying the final exit code.
    pub async fn run(&self, request: &PromptRequest) -> Result<String> {
        // LOCATE — terminal on failure, nothing to clean up yet.
        let path = template::locate(&request.template_name, &self.search_paths)?;
        let source = tokio::fs::read_to_string(&path).await?;

        // RENDER — a malformed template is terminal; directive faults were
        // already absorbed into inline markers by resolve_all.
        let mut variables = request.variables.clone();
        config::normalize_constitution_patterns(&mut variables);
        let rendered = template::render(&source, &variables)?;
        let prompt_text = template::resolve_all(rendered).await;

        // Operator-visible copy of the exact dispatched prompt. Deleted by
        // the drop guard on every exit path.
        let _buffer = PromptBuffer::write(&self.buffer_dir, &request.template_name, &prompt_text)?;

        match self.drive(request, prompt_text).await {
            RoundsOutcome::Success(output) => Ok(output),
            RoundsOutcome::Failed(code) => Err(RunnerError::SessionFailed(code)),
        }
    }

    /// Render and return the final prompt text without invoking any model.
    /// Operator debugging aid; no prompt buffer is written.
    pub async fn render_only(&self, request: &PromptRequest) -> Result<String> {
        let path = template::locate(&request.template_name, &self.search_paths)?;
        let source = tokio::fs::read_to_string(&path).await?;
        let mut variables = request.variables.clone();
        config::normalize_constitution_patterns(&mut variables);
        let rendered = template::render(&source, &variables)?;
        Ok(template::resolve_all(rendered).await)
    }

    /// ATTEMPT rounds plus the interactive loop. The accumulated prompt
    /// grows across turns: round output, then `User: <line>`.
    async fn drive(&self, request: &PromptRequest, mut prompt_text: String) -> RoundsOutcome {
        loop {
            let mut fatal_code = 0;
            let mut round_output = None;

            for model in &request.models {
                self.reporter.info(&format!("invoking {model}"));
                let attempt = invoke(self.runner.as_ref(), model, &prompt_text).await;
                if attempt.succeeded() {
                    round_output = Some(attempt.output);
                    break;
                }
                if attempt.should_retry {
                    self.reporter
                        .warn(&format!("model {model} exhausted, trying next model"));
                    continue;
                }
                // Fatal: stop the round, skip the remaining models.
                fatal_code = attempt.exit_code;
                break;
            }

            let Some(output) = round_output else {
                if fatal_code != 0 {
                    self.reporter
                        .warn(&format!("model attempt failed with exit code {fatal_code}"));
                    return RoundsOutcome::Failed(fatal_code);
                }
                // Every configured model was tried and exhausted.
                self.reporter.warn("all model attempts failed");
                return RoundsOutcome::Failed(1);
            };

            if !request.interactive {
                return RoundsOutcome::Success(output);
            }

            // INTERACTIVE_WAIT — append the transcript, ask the operator.
            prompt_text.push_str("\n\n");
            prompt_text.push_str(&output);

            let line = match self.input.read_line("> ").await {
                Ok(Some(line)) => line,
                // End of input terminates the loop like an explicit exit.
                Ok(None) | Err(_) => return RoundsOutcome::Success(output),
            };
            let trimmed = line.trim();
            if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
                return RoundsOutcome::Success(output);
            }
            prompt_text.push_str(&format!("\n\nUser: {trimmed}"));
        }
    }
}

enum RoundsOutcome {
    Success(String),
    Failed(i32),
}

// ─── Tests ────────────────────────────────────────────────────────────────
