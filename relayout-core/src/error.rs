//! Error types for Relayout

use std::path::PathBuf;

use thiserror::Error;

use crate::migrate::PhaseError;

/// Result type alias for Relayout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Relayout operations
///
/// Variants up to `FileWorktreeNameConflict` are raised by the planners
/// before anything on disk has been touched. `Phase` is raised by the
/// executors once mutation has begun.
#[derive(Error, Debug)]
pub enum Error {
    /// Migration options were rejected before planning
    #[error("Invalid migration options: {0}")]
    InvalidOptions(String),

    /// No `.git` entry at the given path
    #[error("Not a git repository: {}", .0.display())]
    NotAGitRepository(PathBuf),

    /// Repository already uses the bare-in-.git layout
    #[error("Repository at {} is already using bare structure", .0.display())]
    AlreadyBare(PathBuf),

    /// Repository already uses the regular layout
    #[error("Repository at {} is already using regular structure", .0.display())]
    AlreadyRegular(PathBuf),

    /// `.git` is a file, so the path is a linked worktree and not a repository root
    #[error(
        "{} is a worktree, not a repository root. Run this from the main repository.",
        .0.display()
    )]
    PathIsWorktree(PathBuf),

    /// Repositories with submodules cannot be migrated
    #[error("Repositories with submodules are not supported (found {})", .0.display())]
    SubmodulesUnsupported(PathBuf),

    /// A computed target path is already occupied
    #[error(
        "Target path conflict: cannot move {} to {} because the target already exists",
        path.display(),
        target.display()
    )]
    TargetPathConflict { path: PathBuf, target: PathBuf },

    /// The repository root is not on a branch
    #[error(
        "Repository at {} has a detached HEAD. Check out a branch before migrating.",
        .0.display()
    )]
    DetachedHead(PathBuf),

    /// Two worktrees would share one metadata directory
    #[error(
        "Worktree metadata name conflict: '{name}' would be used by branches {}",
        branches.join(", ")
    )]
    MetadataNameConflict { name: String, branches: Vec<String> },

    /// Neither the remote HEAD nor the git directory names a default branch
    #[error("Could not determine the default branch of {}", .0.display())]
    NoDefaultBranch(PathBuf),

    /// No worktree has the default branch checked out
    #[error(
        "No worktree found for default branch '{branch}'. Worktrees exist for: {}. \
         Create one with 'git worktree add <path> {branch}' and retry.",
        format_available(available)
    )]
    NoDefaultBranchWorktree {
        branch: String,
        available: Vec<String>,
    },

    /// A file in the default-branch worktree would land on another worktree
    #[error(
        "File '{file}' in the default branch worktree conflicts with {} at the repository root",
        worktree.display()
    )]
    FileWorktreeNameConflict { file: String, worktree: PathBuf },

    /// A step of a migration failed after mutation began
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// libgit2 error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// A `.git` pointer file or metadata `gitdir` file is unreadable as a link
    #[error("Invalid worktree link: {} does not point at a git directory", .0.display())]
    InvalidGitLink(PathBuf),

    /// `git worktree list --porcelain` produced output we cannot parse
    #[error("Unexpected 'git worktree list' output: {0}")]
    InvalidWorktreeList(String),

    /// A `git` subprocess exited unsuccessfully
    #[error("'git {command}' failed: {stderr}")]
    Command { command: String, stderr: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error was raised before any mutation.
    ///
    /// Validation errors are safe to retry once the cause is addressed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidOptions(_)
                | Error::NotAGitRepository(_)
                | Error::AlreadyBare(_)
                | Error::AlreadyRegular(_)
                | Error::PathIsWorktree(_)
                | Error::SubmodulesUnsupported(_)
                | Error::TargetPathConflict { .. }
                | Error::DetachedHead(_)
                | Error::MetadataNameConflict { .. }
                | Error::NoDefaultBranch(_)
                | Error::NoDefaultBranchWorktree { .. }
                | Error::FileWorktreeNameConflict { .. }
        )
    }

    /// The failed phase, if this is an execution error
    pub fn phase(&self) -> Option<crate::migrate::Phase> {
        match self {
            Error::Phase(e) => Some(e.phase),
            _ => None,
        }
    }
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    }
}
