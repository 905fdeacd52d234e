//! Git operations for Relayout
//!
//! This module provides repository inspection, worktree enumeration, and the
//! `git` subprocess calls that have no libgit2 equivalent.

mod command;
mod repo;
mod worktree;

pub use command::{run_git, worktree_prune, worktree_repair};
pub use repo::{detect_layout, inspect, resolve_repo_path, GitRepo, Layout, RemoteInfo, Repository};
pub use worktree::{list_worktrees, read_gitdir_file, write_gitdir_file, Worktree, GITDIR_PREFIX};
