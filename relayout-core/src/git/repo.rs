//! Repository inspection
//!
//! Classifies a path as a regular or bare-in-.git repository and reads the
//! branch, upstream and remote state the planners need. Everything here is
//! read-only.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{BranchType, Repository as Git2Repository};
use serde::Serialize;

use crate::{Error, Result};

/// On-disk layout of a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Working tree at the root, metadata in `.git/`
    Regular,
    /// Bare object store in `.git/`, checkouts as worktrees
    Bare,
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Regular => write!(f, "regular"),
            Layout::Bare => write!(f, "bare"),
        }
    }
}

/// Information about a git remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteInfo {
    /// Name of the remote (e.g., "origin")
    pub name: String,
    /// URL of the remote
    pub url: String,
}

impl RemoteInfo {
    /// Repository name encoded in the remote URL
    ///
    /// Handles `https://host/owner/repo.git`, `git@host:owner/repo.git`
    /// and plain filesystem paths.
    pub fn repo_name(&self) -> Option<String> {
        let url = self.url.trim().trim_end_matches('/');

        let path = match url::Url::parse(url) {
            Ok(parsed) if parsed.has_host() => parsed.path().to_string(),
            _ => match url.split_once(':') {
                Some((host, path)) if host.contains('@') => path.to_string(),
                _ => url.to_string(),
            },
        };

        let last = path
            .trim_end_matches('/')
            .rsplit(['/', '\\'])
            .next()?
            .trim_end_matches(".git");

        if last.is_empty() {
            None
        } else {
            Some(last.to_string())
        }
    }
}

/// Snapshot of a repository's layout and branch state
#[derive(Debug, Clone, Serialize)]
pub struct Repository {
    /// Absolute, symlink-resolved repository root
    pub path: PathBuf,
    pub layout: Layout,
    /// `<root>/.git`
    pub git_dir: PathBuf,
    /// Branch at the root (regular) or named by the git directory's `HEAD` (bare)
    pub current_branch: Option<String>,
    /// Upstream of `current_branch` as `remote/branch`
    pub upstream: Option<String>,
    pub origin: Option<RemoteInfo>,
}

/// Resolve `path` to an absolute, symlink-free path
pub fn resolve_repo_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotAGitRepository(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })
}

/// Classify the repository rooted at `root` by its `.git` entry.
///
/// A `.git` file means `root` is a linked worktree.
pub fn detect_layout(root: &Path) -> Result<Layout> {
    let dot_git = root.join(".git");
    let meta = match fs::symlink_metadata(&dot_git) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotAGitRepository(root.to_path_buf()));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    if meta.is_file() {
        return Err(Error::PathIsWorktree(root.to_path_buf()));
    }

    let git = GitRepo::open(&dot_git)?;
    if git.inner().is_bare() {
        Ok(Layout::Bare)
    } else {
        Ok(Layout::Regular)
    }
}

/// Inspect the repository rooted at `path`
pub fn inspect(path: &Path) -> Result<Repository> {
    let root = resolve_repo_path(path)?;
    let layout = detect_layout(&root)?;
    let git_dir = root.join(".git");
    let git = GitRepo::open(&git_dir)?;

    let current_branch = git.head_branch()?;
    let upstream = match &current_branch {
        Some(branch) => git.upstream(branch),
        None => None,
    };

    Ok(Repository {
        path: root,
        layout,
        git_dir,
        current_branch,
        upstream,
        origin: git.origin(),
    })
}

/// A git2 repository wrapper with the queries migration needs
pub struct GitRepo {
    repo: Git2Repository,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("path", &self.repo.path())
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open a repository, a git directory, or a linked worktree at exactly `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Git2Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::NotAGitRepository(path.to_path_buf())
            } else {
                Error::Git(e)
            }
        })?;
        Ok(Self { repo })
    }

    /// Branch named by `HEAD`, `None` when detached.
    ///
    /// Reads the symbolic ref directly so an unborn branch still has a name.
    pub fn head_branch(&self) -> Result<Option<String>> {
        let head = self.repo.find_reference("HEAD")?;
        Ok(head
            .symbolic_target()
            .and_then(|t| t.strip_prefix("refs/heads/"))
            .map(str::to_string))
    }

    /// Upstream of a local branch as `remote/branch`
    pub fn upstream(&self, branch: &str) -> Option<String> {
        let local = self.repo.find_branch(branch, BranchType::Local).ok()?;
        let upstream = local.upstream().ok()?;
        let name = upstream.name().ok().flatten()?;
        Some(name.to_string())
    }

    /// Whether a remote-tracking branch such as `origin/main` exists
    pub fn remote_branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, BranchType::Remote).is_ok()
    }

    /// Point a local branch's upstream at `upstream` (`remote/branch`)
    pub fn set_upstream(&self, branch: &str, upstream: &str) -> Result<()> {
        let mut local = self.repo.find_branch(branch, BranchType::Local)?;
        local.set_upstream(Some(upstream))?;
        Ok(())
    }

    /// The `origin` remote, if configured with a URL
    pub fn origin(&self) -> Option<RemoteInfo> {
        let remote = self.repo.find_remote("origin").ok()?;
        let url = remote.url()?;
        Some(RemoteInfo {
            name: "origin".to_string(),
            url: url.to_string(),
        })
    }

    /// The repository's default branch
    ///
    /// Priority:
    /// 1. `origin/HEAD` symbolic target
    /// 2. origin/main
    /// 3. origin/master
    /// 4. Branch named by the git directory's own `HEAD`
    pub fn default_branch(&self) -> Result<Option<String>> {
        if let Ok(remote_head) = self.repo.find_reference("refs/remotes/origin/HEAD") {
            if let Some(branch) = remote_head
                .symbolic_target()
                .and_then(|t| t.strip_prefix("refs/remotes/origin/"))
            {
                return Ok(Some(branch.to_string()));
            }
        }

        for candidate in ["main", "master"] {
            if self.remote_branch_exists(&format!("origin/{}", candidate)) {
                return Ok(Some(candidate.to_string()));
            }
        }

        self.head_branch()
    }

    /// Get access to the underlying git2 repository
    pub fn inner(&self) -> &Git2Repository {
        &self.repo
    }
}
