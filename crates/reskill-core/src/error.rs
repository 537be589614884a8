use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReskillError {
    #[error("template '{}' not found; searched: {}", .name, .searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    TemplateNotFound { name: String, searched: Vec<PathBuf> },

    #[error("template render error: {0}")]
    TemplateRender(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReskillError>;
