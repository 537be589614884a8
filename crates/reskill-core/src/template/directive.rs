//! Phase 2: concurrent directive resolution and token substitution.
//!
//! Every pending directive runs as its own task; completion order is
//! irrelevant, and a failure in one never affects the others. Directive
//! faults are downgraded to inline markers and logged at debug level —
//! they never escape to the caller.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::debug;

use super::render::{DirectiveKind, RenderedTemplate};

/// Await every pending directive and substitute its token in the rendered
/// text. A task that itself fails (panics) leaves an
/// `[Error resolving <token>]` marker; all other faults already resolved
/// to their own markers inside the task.
pub async fn resolve_all(rendered: RenderedTemplate) -> String {
    let RenderedTemplate { mut text, pending } = rendered;

    let handles: Vec<_> = pending
        .iter()
        .map(|d| tokio::spawn(resolve(d.kind.clone())))
        .collect();
    let results = join_all(handles).await;

    for (directive, result) in pending.iter().zip(results) {
        let value = match result {
            Ok(v) => v,
            Err(e) => {
                debug!(token = %directive.token, error = %e, "directive task failed");
                format!("[Error resolving {}]", directive.token)
            }
        };
        text = text.replace(&directive.token, &value);
    }
    text
}

async fn resolve(kind: DirectiveKind) -> String {
    match kind {
        DirectiveKind::Context { path } => resolve_context(&path).await,
        DirectiveKind::Read { paths } => {
            let parts = join_all(paths.iter().map(|p| read_one(p.clone()))).await;
            parts.join("\n\n")
        }
    }
}

// ─── context(path) ────────────────────────────────────────────────────────

async fn resolve_context(path: &str) -> String {
    match tokio::fs::metadata(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => format!("[Path not found: {path}]"),
        Err(e) => {
            debug!(path, error = %e, "context stat failed");
            format!("[Error generating context for {path}]")
        }
        Ok(meta) if meta.is_dir() => {
            let root = PathBuf::from(path);
            match tokio::task::spawn_blocking(move || pack_directory(&root)).await {
                Ok(Ok(packed)) => envelope(path, &packed),
                Ok(Err(e)) => {
                    debug!(path, error = %e, "directory pack failed");
                    format!("[Error generating context for {path}]")
                }
                Err(e) => {
                    debug!(path, error = %e, "directory pack task failed");
                    format!("[Error generating context for {path}]")
                }
            }
        }
        Ok(_) => match tokio::fs::read_to_string(path).await {
            Ok(content) => envelope(path, &content),
            Err(e) => {
                debug!(path, error = %e, "context read failed");
                format!("[Error generating context for {path}]")
            }
        },
    }
}

/// Wrap content in the contextual envelope tagged with its path.
fn envelope(path: &str, content: &str) -> String {
    format!("--- Context from: {path} ---\n{content}\n--- End context: {path} ---")
}

/// Aggregate a directory subtree into one packed blob: per-file envelopes,
/// sorted for determinism, honoring standard ignore rules (gitignore,
/// hidden files, VCS metadata) via the `ignore` walker.
fn pack_directory(root: &Path) -> std::io::Result<String> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in ignore::WalkBuilder::new(root).build() {
        let entry = entry.map_err(std::io::Error::other)?;
        if entry.file_type().is_some_and(|t| t.is_file()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut packed = String::new();
    for file in files {
        // Binary or otherwise unreadable files are skipped, not fatal.
        let Ok(content) = std::fs::read_to_string(&file) else {
            debug!(path = %file.display(), "skipping unreadable file in context pack");
            continue;
        };
        if !packed.is_empty() {
            packed.push_str("\n\n");
        }
        packed.push_str(&envelope(&file.display().to_string(), &content));
    }
    Ok(packed)
}

// ─── read(paths) ──────────────────────────────────────────────────────────

async fn read_one(path: String) -> String {
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => format!("[File not found: {path}]"),
        Err(e) => {
            debug!(path, error = %e, "read directive failed");
            format!("[Error reading file {path}]")
        }
    }
}
