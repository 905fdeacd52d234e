//! Worktree enumeration and `.git` pointer file parsing

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::command::run_git;
use crate::{Error, Result};

/// Prefix of the single line in a worktree's `.git` file
pub const GITDIR_PREFIX: &str = "gitdir: ";

/// A worktree as reported by `git worktree list --porcelain`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    /// Path to the worktree directory
    pub path: PathBuf,
    /// Commit checked out
    pub head: String,
    /// Branch name without `refs/heads/`, `None` when detached
    pub branch: Option<String>,
    /// Entry describing the bare repository itself
    pub bare: bool,
    pub detached: bool,
    pub locked: Option<String>,
    pub prunable: Option<String>,
}

impl Worktree {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            head: String::new(),
            branch: None,
            bare: false,
            detached: false,
            locked: None,
            prunable: None,
        }
    }

    /// Name of the metadata directory under `<gitdir>/worktrees/`.
    ///
    /// Read from the worktree's `.git` file because git keeps the original
    /// name when a worktree folder is renamed.
    pub fn metadata_name(&self) -> Option<String> {
        let target = read_gitdir_file(&self.path.join(".git")).ok()?;
        target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// List all worktrees of the repository that `dir` belongs to
pub fn list_worktrees(dir: &Path) -> Result<Vec<Worktree>> {
    let stdout = run_git(dir, &["worktree", "list", "--porcelain"])?;
    parse_worktree_list(&stdout)
}

fn parse_worktree_list(output: &str) -> Result<Vec<Worktree>> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;

    for line in output.lines() {
        if line.is_empty() {
            if let Some(wt) = current.take() {
                worktrees.push(wt);
            }
            continue;
        }

        let (key, value) = match line.split_once(' ') {
            Some((k, v)) => (k, Some(v)),
            None => (line, None),
        };

        if key == "worktree" {
            let path = value.ok_or_else(|| {
                Error::InvalidWorktreeList("worktree line without a path".to_string())
            })?;
            if let Some(wt) = current.replace(Worktree::new(PathBuf::from(path))) {
                worktrees.push(wt);
            }
            continue;
        }

        let Some(wt) = current.as_mut() else {
            continue;
        };

        match key {
            "HEAD" => wt.head = value.unwrap_or_default().to_string(),
            "branch" => {
                let branch_ref = value.unwrap_or_default();
                wt.branch = Some(
                    branch_ref
                        .strip_prefix("refs/heads/")
                        .unwrap_or(branch_ref)
                        .to_string(),
                );
            }
            "bare" => wt.bare = true,
            "detached" => wt.detached = true,
            "locked" => wt.locked = Some(value.unwrap_or_default().to_string()),
            "prunable" => wt.prunable = Some(value.unwrap_or_default().to_string()),
            // Newer git versions add attributes
            _ => {}
        }
    }

    if let Some(wt) = current {
        worktrees.push(wt);
    }

    Ok(worktrees)
}

/// Read a `.git` pointer file and return the path it names.
///
/// Relative targets are resolved against the file's directory.
pub fn read_gitdir_file(dot_git: &Path) -> Result<PathBuf> {
    let contents = fs::read_to_string(dot_git)?;
    let target = contents
        .lines()
        .next()
        .and_then(|line| line.strip_prefix(GITDIR_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::InvalidGitLink(dot_git.to_path_buf()))?;

    let target = PathBuf::from(target);
    if target.is_absolute() {
        return Ok(target);
    }

    let base = dot_git.parent().unwrap_or_else(|| Path::new("."));
    Ok(crate::migrate::normalize_path(&base.join(target)))
}

/// Write a `.git` pointer file
pub fn write_gitdir_file(dot_git: &Path, target: &Path) -> std::io::Result<()> {
    fs::write(dot_git, format!("{}{}\n", GITDIR_PREFIX, target.display()))
}
