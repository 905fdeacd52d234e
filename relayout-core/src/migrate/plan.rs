//! Migration planning
//!
//! Planners inspect a repository, compute every target path and metadata
//! name, and reject the migration on the first invariant violation. They
//! never write to disk. Executors consume the returned plan as is and
//! never recompute a path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::path::{resolve_worktree_path, sanitize_branch, PathContext};
use crate::git::{detect_layout, list_worktrees, resolve_repo_path, GitRepo, Layout, Worktree};
use crate::{Error, Result};

/// Caller-supplied migration settings
#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Worktree path template, e.g. `{branch}` or `../{repo}-{branch}`
    pub worktree_format: String,
    /// Value of `{repo}`; empty means the repository directory name
    pub repo_name: String,
}

impl MigrationOptions {
    pub fn new(worktree_format: impl Into<String>) -> Self {
        Self {
            worktree_format: worktree_format.into(),
            repo_name: String::new(),
        }
    }

    pub fn with_repo_name(mut self, repo_name: impl Into<String>) -> Self {
        self.repo_name = repo_name.into();
        self
    }

    /// Reject options that cannot produce a path
    pub fn validate(&self) -> Result<()> {
        if self.worktree_format.trim().is_empty() {
            return Err(Error::InvalidOptions(
                "worktree format must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Planned relocation of one secondary worktree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorktreeMigration {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    /// Branch checked out, `None` when detached
    pub branch: Option<String>,
    /// Upstream as `remote/branch`
    pub upstream: Option<String>,
    /// Current directory name under `<gitdir>/worktrees/`
    pub old_name: String,
    /// Directory name under `<gitdir>/worktrees/` after migration
    pub new_name: String,
    /// `old_path != new_path`
    pub needs_move: bool,
}

/// Plan for converting a regular repository to bare-in-.git
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    pub repo_path: PathBuf,
    pub git_dir: PathBuf,
    pub current_branch: String,
    pub upstream: Option<String>,
    /// Where the root's working files end up
    pub main_worktree_path: PathBuf,
    /// Metadata directory name of the new main worktree
    pub main_metadata_name: String,
    pub worktrees: Vec<WorktreeMigration>,
}

/// Plan for converting a bare-in-.git repository to regular
#[derive(Debug, Clone, Serialize)]
pub struct RegularMigrationPlan {
    pub repo_path: PathBuf,
    pub git_dir: PathBuf,
    pub default_branch: String,
    /// Worktree whose files move up to the root
    pub default_worktree_path: PathBuf,
    /// Its metadata directory name, deleted during migration
    pub default_metadata_name: String,
    pub upstream: Option<String>,
    pub worktrees: Vec<WorktreeMigration>,
}

/// Plan a regular to bare-in-.git migration of the repository at `repo_path`
pub fn validate_migration(repo_path: &Path, opts: &MigrationOptions) -> Result<MigrationPlan> {
    opts.validate()?;

    let root = resolve_repo_path(repo_path)?;
    if detect_layout(&root)? == Layout::Bare {
        return Err(Error::AlreadyBare(root));
    }

    let gitmodules = root.join(".gitmodules");
    if gitmodules.exists() {
        return Err(Error::SubmodulesUnsupported(gitmodules));
    }

    let git_dir = root.join(".git");
    let git = GitRepo::open(&git_dir)?;
    let current_branch = git
        .head_branch()?
        .ok_or_else(|| Error::DetachedHead(root.clone()))?;
    let upstream = git.upstream(&current_branch);

    let repo_name = repo_name(&root, opts);
    let origin_name = git.origin().and_then(|o| o.repo_name());
    let ctx = PathContext {
        repo_root: &root,
        repo_name: &repo_name,
        origin_name: origin_name.as_deref(),
    };

    let main_worktree_path =
        resolve_worktree_path(&opts.worktree_format, &ctx, &current_branch);
    check_main_target(&root, &main_worktree_path)?;

    let worktrees = plan_worktrees(&git, &root, &ctx, &opts.worktree_format, &root)?;

    let main_metadata_name = sanitize_branch(&current_branch);
    check_metadata_names(
        &git_dir,
        Some((&main_metadata_name, &current_branch)),
        &worktrees,
    )?;

    tracing::debug!(
        repo = %root.display(),
        main = %main_worktree_path.display(),
        worktrees = worktrees.len(),
        "Planned migration to bare"
    );

    Ok(MigrationPlan {
        repo_path: root,
        git_dir,
        current_branch,
        upstream,
        main_worktree_path,
        main_metadata_name,
        worktrees,
    })
}

/// Plan a bare-in-.git to regular migration of the repository at `repo_path`
pub fn validate_migration_to_regular(
    repo_path: &Path,
    opts: &MigrationOptions,
) -> Result<RegularMigrationPlan> {
    opts.validate()?;

    let root = resolve_repo_path(repo_path)?;
    if detect_layout(&root)? == Layout::Regular {
        return Err(Error::AlreadyRegular(root));
    }

    let git_dir = root.join(".git");
    let git = GitRepo::open(&git_dir)?;
    let default_branch = git
        .default_branch()?
        .ok_or_else(|| Error::NoDefaultBranch(root.clone()))?;

    let listed = checkouts(&git_dir)?;
    let default_wt = listed
        .iter()
        .find(|wt| wt.branch.as_deref() == Some(default_branch.as_str()))
        .ok_or_else(|| Error::NoDefaultBranchWorktree {
            branch: default_branch.clone(),
            available: listed
                .iter()
                .map(|wt| wt.branch.clone().unwrap_or_else(|| "(detached)".to_string()))
                .collect(),
        })?;
    let default_worktree_path = default_wt.path.clone();

    let gitmodules = default_worktree_path.join(".gitmodules");
    if gitmodules.exists() {
        return Err(Error::SubmodulesUnsupported(gitmodules));
    }

    let default_metadata_name = default_wt
        .metadata_name()
        .unwrap_or_else(|| sanitize_branch(&default_branch));
    let upstream = git.upstream(&default_branch);

    let repo_name = repo_name(&root, opts);
    let origin_name = git.origin().and_then(|o| o.repo_name());
    let ctx = PathContext {
        repo_root: &root,
        repo_name: &repo_name,
        origin_name: origin_name.as_deref(),
    };

    let worktrees = plan_worktrees(
        &git,
        &git_dir,
        &ctx,
        &opts.worktree_format,
        &default_worktree_path,
    )?;
    check_metadata_names(&git_dir, None, &worktrees)?;
    check_file_conflicts(&root, &default_worktree_path, &worktrees)?;

    tracing::debug!(
        repo = %root.display(),
        default = %default_worktree_path.display(),
        worktrees = worktrees.len(),
        "Planned migration to regular"
    );

    Ok(RegularMigrationPlan {
        repo_path: root,
        git_dir,
        default_branch,
        default_worktree_path,
        default_metadata_name,
        upstream,
        worktrees,
    })
}

fn repo_name(root: &Path, opts: &MigrationOptions) -> String {
    if !opts.repo_name.is_empty() {
        return opts.repo_name.clone();
    }
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repo".to_string())
}

/// Non-bare worktrees with canonical paths; stale entries are left for prune
fn checkouts(dir: &Path) -> Result<Vec<Worktree>> {
    let mut result = Vec::new();
    for mut wt in list_worktrees(dir)? {
        if wt.bare {
            continue;
        }
        match fs::canonicalize(&wt.path) {
            Ok(path) => wt.path = path,
            Err(_) => {
                tracing::debug!(path = %wt.path.display(), "Skipping missing worktree");
                continue;
            }
        }
        result.push(wt);
    }
    Ok(result)
}

/// Plan every worktree listed from `list_dir` other than `skip`
fn plan_worktrees(
    git: &GitRepo,
    list_dir: &Path,
    ctx: &PathContext<'_>,
    template: &str,
    skip: &Path,
) -> Result<Vec<WorktreeMigration>> {
    let mut planned = Vec::new();

    for wt in checkouts(list_dir)? {
        if wt.path == skip {
            continue;
        }

        let folder_name = wt
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let old_name = wt
            .metadata_name()
            .unwrap_or_else(|| sanitize_branch(wt.branch.as_deref().unwrap_or(&folder_name)));

        // Detached worktrees have nothing to name them by and stay put
        let (new_path, new_name, upstream) = match &wt.branch {
            Some(branch) => (
                resolve_worktree_path(template, ctx, branch),
                sanitize_branch(branch),
                git.upstream(branch),
            ),
            None => (wt.path.clone(), old_name.clone(), None),
        };

        let needs_move = new_path != wt.path;
        if needs_move && fs::symlink_metadata(&new_path).is_ok() {
            return Err(Error::TargetPathConflict {
                path: wt.path,
                target: new_path,
            });
        }

        planned.push(WorktreeMigration {
            old_path: wt.path,
            new_path,
            branch: wt.branch,
            upstream,
            old_name,
            new_name,
            needs_move,
        });
    }

    Ok(planned)
}

/// The main worktree target and, when nested, its first component under
/// the root must be free
fn check_main_target(root: &Path, main: &Path) -> Result<()> {
    let conflict = |target: PathBuf| Error::TargetPathConflict {
        path: root.to_path_buf(),
        target,
    };

    if main == root || root.starts_with(main) {
        return Err(conflict(main.to_path_buf()));
    }
    if fs::symlink_metadata(main).is_ok() {
        return Err(conflict(main.to_path_buf()));
    }
    if let Ok(rel) = main.strip_prefix(root) {
        if let Some(first) = rel.components().next() {
            let top = root.join(first);
            if fs::symlink_metadata(&top).is_ok() {
                return Err(conflict(top));
            }
        }
    }
    Ok(())
}

/// New metadata names must be unique, must not take over another
/// worktree's current metadata directory, and must not land on a stale one
fn check_metadata_names(
    git_dir: &Path,
    main: Option<(&String, &String)>,
    worktrees: &[WorktreeMigration],
) -> Result<()> {
    let mut claimed: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    if let Some((name, branch)) = main {
        claimed.entry(name.as_str()).or_default().push(branch.clone());
    }
    for wt in worktrees {
        let label = wt.branch.clone().unwrap_or_else(|| wt.old_name.clone());
        claimed.entry(wt.new_name.as_str()).or_default().push(label);
    }

    if let Some((name, branches)) = claimed.iter().find(|(_, b)| b.len() > 1) {
        return Err(Error::MetadataNameConflict {
            name: name.to_string(),
            branches: branches.clone(),
        });
    }

    let metadata_root = git_dir.join("worktrees");
    let check = |new_name: &str, own_old: Option<&str>, label: String| -> Result<()> {
        if own_old == Some(new_name) {
            return Ok(());
        }
        if metadata_root.join(new_name).exists() {
            return Err(Error::MetadataNameConflict {
                name: new_name.to_string(),
                branches: vec![label],
            });
        }
        Ok(())
    };

    if let Some((name, branch)) = main {
        check(name.as_str(), None, branch.clone())?;
    }
    for wt in worktrees {
        let label = wt.branch.clone().unwrap_or_else(|| wt.old_name.clone());
        check(wt.new_name.as_str(), Some(wt.old_name.as_str()), label)?;
    }
    Ok(())
}

/// Files moving up from the default worktree must not land on anything at
/// the root, including directories other worktrees occupy now or after.
/// Entries holding another worktree are rejected too, since moving them
/// would carry that worktree along.
fn check_file_conflicts(
    root: &Path,
    default_worktree: &Path,
    worktrees: &[WorktreeMigration],
) -> Result<()> {
    for entry in fs::read_dir(default_worktree)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        let file = name.to_string_lossy().into_owned();
        let target = root.join(&name);
        let source = entry.path();

        let conflict = |worktree: &Path| Error::FileWorktreeNameConflict {
            file: file.clone(),
            worktree: worktree.to_path_buf(),
        };

        for wt in worktrees {
            if wt.old_path.starts_with(&source) {
                return Err(conflict(&wt.old_path));
            }
            for path in [&wt.old_path, &wt.new_path] {
                if path.starts_with(&target) {
                    return Err(conflict(path));
                }
            }
        }

        if fs::symlink_metadata(&target).is_ok() {
            return Err(conflict(&target));
        }
    }
    Ok(())
}
