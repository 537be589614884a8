use crate::error::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from leaving a truncated prompt on disk.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Session-scoped path for the rendered-prompt buffer under `dir`.
///
/// Timestamp plus a v4 uuid keeps concurrent sessions from colliding.
pub fn session_buffer_path(dir: &Path, template_name: &str) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let slug: String = template_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    dir.join(format!(
        "reskill-prompt-{slug}-{stamp}-{}.md",
        uuid::Uuid::new_v4()
    ))
}

/// Best-effort delete. Failures are swallowed: buffer cleanup must never
/// mask the session's real outcome.
pub fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %e, "failed to remove prompt buffer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompt.md");
        atomic_write(&path, b"hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/prompt.md");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn session_buffer_paths_are_unique() {
        let dir = TempDir::new().unwrap();
        let a = session_buffer_path(dir.path(), "audit");
        let b = session_buffer_path(dir.path(), "audit");
        assert_ne!(a, b);
    }

    #[test]
    fn session_buffer_path_sanitizes_name() {
        let dir = TempDir::new().unwrap();
        let p = session_buffer_path(dir.path(), "sub/dir name");
        let file = p.file_name().unwrap().to_string_lossy().into_owned();
        assert!(!file.contains('/'));
        assert!(!file.contains(' '));
    }

    #[test]
    fn remove_quietly_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        remove_quietly(&dir.path().join("never-existed.md"));
    }
}
