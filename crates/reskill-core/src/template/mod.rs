//! Prompt template pipeline: locate → render → resolve.
//!
//! Rendering is a two-phase protocol. Phase 1 ([`render`]) expands
//! `{{ ... }}` expressions synchronously; each `context(...)`/`read(...)`
//! directive mints a unique token placeholder and records a pending
//! descriptor instead of doing I/O. Phase 2 ([`resolve_all`]) runs every
//! pending directive concurrently and substitutes the tokens, downgrading
//! any failure to an inline error marker.

mod directive;
mod render;

pub use directive::resolve_all;
pub use render::{render, DirectiveKind, PendingDirective, RenderedTemplate};

use crate::error::{ReskillError, Result};
use std::path::{Path, PathBuf};

/// Resolve a logical template name against an ordered list of search
/// directories: user override first, packaged templates, then the
/// initialized fallback. First existing file wins.
///
/// `.md` is appended when the name carries no extension.
pub fn locate(template_name: &str, search_paths: &[PathBuf]) -> Result<PathBuf> {
    let file_name = if Path::new(template_name).extension().is_some() {
        template_name.to_string()
    } else {
        format!("{template_name}.md")
    };

    let mut searched = Vec::with_capacity(search_paths.len());
    for dir in search_paths {
        let candidate = dir.join(&file_name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    Err(ReskillError::TemplateNotFound {
        name: template_name.to_string(),
        searched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn locate_first_existing_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(first.path().join("audit.md"), "one").unwrap();
        std::fs::write(second.path().join("audit.md"), "two").unwrap();

        let paths = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let found = locate("audit", &paths).unwrap();
        assert_eq!(found, first.path().join("audit.md"));
    }

    #[test]
    fn locate_falls_through_to_later_paths() {
        let empty = TempDir::new().unwrap();
        let packaged = TempDir::new().unwrap();
        std::fs::write(packaged.path().join("critic.md"), "x").unwrap();

        let paths = vec![empty.path().to_path_buf(), packaged.path().to_path_buf()];
        let found = locate("critic", &paths).unwrap();
        assert_eq!(found, packaged.path().join("critic.md"));
    }

    #[test]
    fn locate_appends_md_only_without_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("raw.txt"), "x").unwrap();
        let paths = vec![dir.path().to_path_buf()];
        let found = locate("raw.txt", &paths).unwrap();
        assert_eq!(found, dir.path().join("raw.txt"));
    }

    #[test]
    fn locate_missing_lists_all_candidates() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let paths = vec![a.path().to_path_buf(), b.path().to_path_buf()];

        let err = locate("ghost", &paths).unwrap_err();
        match &err {
            ReskillError::TemplateNotFound { name, searched } => {
                assert_eq!(name, "ghost");
                assert_eq!(searched.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains(a.path().to_str().unwrap()));
        assert!(msg.contains(b.path().to_str().unwrap()));
    }
}
