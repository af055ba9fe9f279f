//! # IO Utilities
//!
//! Project directory layout and file helpers shared by agents and state files.
//!
//! ```text
//! <project>/
//!   drafts/  reports/  reviews/  research/  final/
//!   .lampoon/
//!     project.json  run_state.json  config.json  workflows/
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Name of the runtime directory inside a project
pub const RUNTIME_DIR: &str = ".lampoon";

/// Content subtrees written by agents
pub const CONTENT_DIRS: [&str; 5] = ["drafts", "reports", "reviews", "research", "final"];

/// Get the runtime directory path (.lampoon) for a project
pub fn runtime_dir(project_path: &Path) -> PathBuf {
    project_path.join(RUNTIME_DIR)
}

pub fn workflows_dir(project_path: &Path) -> PathBuf {
    runtime_dir(project_path).join("workflows")
}

pub fn run_state_path(project_path: &Path) -> PathBuf {
    runtime_dir(project_path).join("run_state.json")
}

pub fn project_file_path(project_path: &Path) -> PathBuf {
    runtime_dir(project_path).join("project.json")
}

pub fn config_path(project_path: &Path) -> PathBuf {
    runtime_dir(project_path).join("config.json")
}

/// Create the runtime directory and every content subtree
pub async fn ensure_layout(project_path: &Path) -> Result<()> {
    for dir in CONTENT_DIRS
        .iter()
        .map(|d| project_path.join(d))
        .chain([runtime_dir(project_path), workflows_dir(project_path)])
    {
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;
    }
    Ok(())
}

/// Write a file relative to the project root, creating parent directories
pub async fn write_project_file(
    project_path: &Path,
    relative_path: impl AsRef<Path>,
    content: &str,
) -> Result<PathBuf> {
    let path = project_path.join(relative_path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write file: {:?}", path))?;

    Ok(path)
}

/// Count regular files under a project subtree (recursive). Missing dirs count as zero.
pub fn count_files(project_path: &Path, subdir: &str) -> usize {
    let dir = project_path.join(subdir);
    if !dir.is_dir() {
        return 0;
    }

    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

/// Turn free text into a file-name slug
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    let slug = slug.trim_end_matches('-');
    let slug: String = slug.chars().take(60).collect();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.trim_end_matches('-').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let root = Path::new("/tmp/piece");
        assert!(runtime_dir(root).ends_with(".lampoon"));
        assert!(run_state_path(root).ends_with(".lampoon/run_state.json"));
        assert!(workflows_dir(root).ends_with(".lampoon/workflows"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Local Man Wins Award!"), "local-man-wins-award");
        assert_eq!(slugify("  --  "), "untitled");
        assert_eq!(slugify("AI & the  Future"), "ai-the-future");
    }

    #[tokio::test]
    async fn test_layout_and_count() {
        let dir = tempfile::tempdir().unwrap();
        ensure_layout(dir.path()).await.unwrap();

        for sub in CONTENT_DIRS {
            assert!(dir.path().join(sub).is_dir());
        }

        write_project_file(dir.path(), "drafts/a.md", "# A").await.unwrap();
        write_project_file(dir.path(), "drafts/nested/b.md", "# B")
            .await
            .unwrap();

        assert_eq!(count_files(dir.path(), "drafts"), 2);
        assert_eq!(count_files(dir.path(), "final"), 0);
        assert_eq!(count_files(dir.path(), "missing"), 0);
    }
}
