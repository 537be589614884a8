use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// Terminal session failure carrying the final exit code: a fatal model
    /// error's code, or 1 when every configured model was exhausted.
    #[error("prompt session failed with exit code {0}")]
    SessionFailed(i32),

    #[error(transparent)]
    Core(#[from] reskill_core::ReskillError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// The numeric code this error maps to at the process boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::SessionFailed(code) => *code,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
