//! Worktree link maintenance
//!
//! A linked worktree and its metadata directory point at each other:
//! `<worktree>/.git` names `<gitdir>/worktrees/<name>`, whose `gitdir` file
//! names `<worktree>/.git`. The two lookups are kept separate so a link can
//! be validated without moving anything.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::path::{normalize_path, relative_path};
use super::phase::{Phase, PhaseContext, PhaseError};
use super::plan::WorktreeMigration;
use crate::git::{read_gitdir_file, worktree_repair, write_gitdir_file};
use crate::{Error, Result};

/// Metadata directory a worktree's `.git` file points at
pub fn resolve_metadata(worktree: &Path) -> Result<PathBuf> {
    read_gitdir_file(&worktree.join(".git"))
}

/// Worktree directory a metadata directory's `gitdir` file points at
pub fn resolve_worktree(metadata_dir: &Path) -> Result<PathBuf> {
    let gitdir_file = metadata_dir.join("gitdir");
    let contents = fs::read_to_string(&gitdir_file)?;
    let contents = contents.trim();
    if contents.is_empty() {
        return Err(Error::InvalidGitLink(gitdir_file));
    }

    let dot_git = PathBuf::from(contents);
    let dot_git = if dot_git.is_absolute() {
        dot_git
    } else {
        normalize_path(&metadata_dir.join(dot_git))
    };

    dot_git
        .parent()
        .map(Path::to_path_buf)
        .ok_or(Error::InvalidGitLink(gitdir_file))
}

/// Whether the worktree at `path` and its metadata directory agree
pub fn is_worktree_link_valid(path: &Path) -> bool {
    let Ok(worktree) = fs::canonicalize(path) else {
        return false;
    };
    let Ok(metadata) = resolve_metadata(&worktree) else {
        return false;
    };
    if !metadata.is_dir() {
        return false;
    }
    match resolve_worktree(&metadata).map(|p| fs::canonicalize(&p)) {
        Ok(Ok(back)) => back == worktree,
        _ => false,
    }
}

/// Whether `git worktree repair` is a candidate fix for the worktree at `path`
///
/// True when the `.git` file exists but the link does not validate.
pub fn can_repair_worktree(path: &Path) -> bool {
    path.join(".git").is_file() && !is_worktree_link_valid(path)
}

/// Health of one `<gitdir>/worktrees/<name>` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Both pointers agree
    Valid,
    /// Worktree exists but the pointers disagree
    Repairable,
    /// The worktree directory is gone; `git worktree prune` removes the entry
    Missing,
}

/// Link report for one metadata directory
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub name: String,
    /// Worktree named by the metadata's `gitdir` file, if readable
    pub worktree: Option<PathBuf>,
    pub status: LinkStatus,
}

/// Check every metadata directory under `<git_dir>/worktrees`
pub fn diagnose_worktrees(git_dir: &Path) -> Result<Vec<LinkReport>> {
    let metadata_root = git_dir.join("worktrees");
    if !metadata_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();
    for entry in fs::read_dir(&metadata_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let worktree = resolve_worktree(&entry.path()).ok();

        let status = match &worktree {
            Some(path) if is_worktree_link_valid(path) => LinkStatus::Valid,
            Some(path) if can_repair_worktree(path) => LinkStatus::Repairable,
            _ => LinkStatus::Missing,
        };

        reports.push(LinkReport {
            name,
            worktree,
            status,
        });
    }

    reports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(reports)
}

/// Run `git worktree repair` for the given worktrees from `dir`
///
/// `dir` is the root of a regular repository or the git directory of a
/// bare one.
pub fn repair_worktrees(dir: &Path, worktrees: &[&Path]) -> Result<()> {
    worktree_repair(dir, worktrees)
}

/// Move a worktree (if planned) and rewrite both halves of its link
pub fn update_worktree_links(
    repo_path: &Path,
    wt: &WorktreeMigration,
) -> std::result::Result<(), PhaseError> {
    let phase = Phase::UpdateWorktreeLinks;
    let git_dir = repo_path.join(".git");
    let metadata_root = git_dir.join("worktrees");
    let repair = format!("git worktree repair {}", wt.new_path.display());

    if wt.needs_move {
        tracing::debug!(
            from = %wt.old_path.display(),
            to = %wt.new_path.display(),
            "Moving worktree"
        );
        if let Some(parent) = wt.new_path.parent() {
            fs::create_dir_all(parent).phase(phase, parent)?;
        }
        fs::rename(&wt.old_path, &wt.new_path)
            .phase(phase, &wt.old_path)
            .map_err(|e| {
                let manual = format!(
                    "git worktree move {} {}",
                    wt.old_path.display(),
                    wt.new_path.display()
                );
                e.remediate(&manual, repo_path)
            })?;
    }

    let metadata_dir = metadata_root.join(&wt.new_name);
    if wt.old_name != wt.new_name {
        let old_metadata = metadata_root.join(&wt.old_name);
        if metadata_dir.exists() {
            return Err(PhaseError::new(
                phase,
                &metadata_dir,
                format!("metadata directory '{}' already exists", wt.new_name),
            ));
        }
        fs::rename(&old_metadata, &metadata_dir)
            .phase(phase, &old_metadata)
            .map_err(|e| e.remediate(&repair, repo_path))?;
    }

    let dot_git = wt.new_path.join(".git");
    write_gitdir_file(&dot_git, &relative_path(&wt.new_path, &metadata_dir))
        .phase(phase, &dot_git)
        .map_err(|e| e.remediate(&repair, repo_path))?;

    fs::write(
        metadata_dir.join("gitdir"),
        format!("{}\n", dot_git.display()),
    )
    .phase(phase, &metadata_dir)
    .map_err(|e| e.remediate(&repair, repo_path))?;

    Ok(())
}
