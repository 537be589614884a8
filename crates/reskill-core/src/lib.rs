//! `reskill-core` — template rendering and configuration types for the
//! reskill prompt runtime.
//!
//! The renderer is deliberately split from process execution: this crate
//! turns a template source plus a JSON variable bag into a final literal
//! prompt string (resolving `context(...)`/`read(...)` directives
//! asynchronously), and knows nothing about models or subprocesses.

pub mod config;
pub mod error;
pub mod io;
pub mod template;

pub use config::{ModelSpec, RunnerConfig, Target, DEFAULT_MODELS};
pub use error::{ReskillError, Result};
