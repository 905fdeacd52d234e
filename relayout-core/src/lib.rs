//! Relayout Core - convert git repositories between layouts
//!
//! A "regular" repository keeps its working tree at the root and metadata in
//! `.git/`. A "bare-in-.git" repository keeps a bare object store in `.git/`
//! and every checkout, including the main one, as a linked worktree. This
//! crate plans and executes conversions in both directions, preserving
//! commits, staged changes, untracked files, upstream tracking and the
//! links between worktrees and their metadata directories.

pub mod config;
pub mod error;
pub mod git;
pub mod migrate;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Error, Result};
pub use git::{inspect, GitRepo, Layout, RemoteInfo, Repository, Worktree};
pub use migrate::{
    can_repair_worktree, diagnose_worktrees, is_worktree_link_valid, migrate_to_bare,
    migrate_to_regular, validate_migration, validate_migration_to_regular, LinkReport,
    LinkStatus, MigrateToBareResult, MigrateToRegularResult, MigrationOptions, MigrationPlan,
    Phase, PhaseError, RegularMigrationPlan, Warning, WarningKind, WorktreeMigration,
};
