//! One prompt-against-one-model attempt, classified.

use std::time::Instant;

use tracing::warn;

use crate::process::ProcessRunner;

/// Error-stream substrings that mean a provider-side rate limit. Plain
/// substring search over raw stderr, preserved exactly as the providers
/// emit them today: a message change silently breaks rotation, which is a
/// known fragility owned by whoever owns the retry policy.
const EXHAUSTION_SIGNATURES: [&str; 3] = ["429", "exhausted your capacity", "ResourceExhausted"];

/// Classified outcome of one model invocation. Produced fresh per attempt,
/// never mutated.
#[derive(Debug, Clone)]
pub struct AttemptResult {
    pub exit_code: i32,
    /// True only when the exit was non-zero AND stderr carried an
    /// exhaustion signature — the one case worth rotating models for.
    pub should_retry: bool,
    pub output: String,
}

impl AttemptResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `prompt` against `model` once and classify the result.
///
/// A spawn failure is an immediate fatal attempt rather than an error: the
/// session controller treats it like any other non-retryable non-zero exit.
pub async fn invoke(runner: &dyn ProcessRunner, model: &str, prompt: &str) -> AttemptResult {
    let started = Instant::now();

    let outcome = match runner.run(model, prompt).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(model, error = %e, "model process failed to start");
            return AttemptResult {
                exit_code: 1,
                should_retry: false,
                output: String::new(),
            };
        }
    };

    let should_retry = outcome.exit_code != 0 && is_exhausted(&outcome.stderr);
    if should_retry {
        warn!(
            model,
            exit_code = outcome.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model capacity exhausted, rotating"
        );
    }

    AttemptResult {
        exit_code: outcome.exit_code,
        should_retry,
        output: outcome.stdout,
    }
}

fn is_exhausted(stderr: &str) -> bool {
    EXHAUSTION_SIGNATURES.iter().any(|sig| stderr.contains(sig))
}
