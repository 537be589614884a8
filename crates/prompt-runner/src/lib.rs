//! `prompt-runner` — executes rendered prompts against an external model
//! CLI with rotation and interactive continuation.
//!
//! # Architecture
//!
//! ```text
//! PromptRequest
//!     │
//!     ▼
//! Session        ← locate + render (reskill-core), prompt buffer guard
//!     │
//!     ▼
//! invoke()       ← one attempt per model, in configured order
//!     │
//!     ▼
//! ProcessRunner  ← capability trait; CliProcessRunner spawns the model
//!                  CLI, mirrors output live, buffers it for classification
//! ```
//!
//! Exhaustion failures (a `429`-style marker in stderr) rotate to the next
//! configured model; any other non-zero exit ends the session with that
//! code. The rendered-prompt temp file is deleted on every exit path.

pub mod error;
pub mod invoker;
pub mod process;
pub mod session;

pub use error::{Result, RunnerError};
pub use invoker::{invoke, AttemptResult};
pub use process::{CliProcessRunner, ProcessOutcome, ProcessRunner};
pub use session::{LineReader, PromptRequest, Reporter, Session, StdinLineReader, TracingReporter};

use std::path::PathBuf;

/// Run a named prompt template with default capabilities: the single entry
/// point hosting code needs.
///
/// # Example
///
/// ```rust,ignore
/// use prompt_runner::{run_prompt, PromptRequest};
///
/// let mut req = PromptRequest::new("auditor");
/// req.models = vec!["gemini-2.5-pro".into(), "gemini-2.5-flash".into()];
/// let output = run_prompt(&req, vec!["prompts".into()]).await?;
/// ```
pub async fn run_prompt(request: &PromptRequest, search_paths: Vec<PathBuf>) -> Result<String> {
    Session::new(search_paths).run(request).await
}
