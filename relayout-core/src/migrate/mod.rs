//! Layout migration between regular and bare-in-.git repositories
//!
//! Callers plan first (`validate_migration`, `validate_migration_to_regular`),
//! show or check the plan, then hand it to the matching executor.

mod execute;
mod links;
mod path;
mod phase;
mod plan;

pub use execute::{
    migrate_to_bare, migrate_to_regular, MigrateToBareResult, MigrateToRegularResult,
    ORIGIN_FETCH_REFSPEC,
};
pub use links::{
    can_repair_worktree, diagnose_worktrees, is_worktree_link_valid, repair_worktrees,
    resolve_metadata, resolve_worktree, update_worktree_links, LinkReport, LinkStatus,
};
pub use path::{normalize_path, relative_path, resolve_worktree_path, sanitize_branch, PathContext};
pub use phase::{Phase, PhaseError, Warning, WarningKind};
pub use plan::{
    validate_migration, validate_migration_to_regular, MigrationOptions, MigrationPlan,
    RegularMigrationPlan, WorktreeMigration,
};
