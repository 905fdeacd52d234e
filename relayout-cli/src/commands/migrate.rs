//! Layout conversion commands

use std::path::{Path, PathBuf};

use clap::Args;
use relayout_core::{
    migrate_to_bare, migrate_to_regular, validate_migration, validate_migration_to_regular,
    Config, MigrateToBareResult, MigrateToRegularResult, MigrationPlan, RegularMigrationPlan,
    WorktreeMigration,
};

/// Convert a regular repository to the bare-in-.git layout
#[derive(Args, Debug)]
pub struct ToBareArgs {
    /// Repository root (defaults to the current directory)
    pub path: Option<PathBuf>,

    /// Print the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the plan or result as JSON
    #[arg(long)]
    pub json: bool,

    /// Value for `{repo}` in the worktree format
    #[arg(long)]
    pub repo_name: Option<String>,
}

/// Convert a bare-in-.git repository back to the regular layout
#[derive(Args, Debug)]
pub struct ToRegularArgs {
    /// Repository root (defaults to the current directory)
    pub path: Option<PathBuf>,

    /// Print the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the plan or result as JSON
    #[arg(long)]
    pub json: bool,

    /// Value for `{repo}` in the worktree format
    #[arg(long)]
    pub repo_name: Option<String>,
}

impl ToBareArgs {
    /// Execute the to-bare command
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let path = repo_path(self.path.as_deref())?;
        let opts = config.migration_options(self.repo_name.clone());
        let plan = validate_migration(&path, &opts)?;

        if self.dry_run {
            if self.json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_bare_plan(&plan);
            }
            return Ok(());
        }

        // Warnings reach stderr through the tracing subscriber
        let result = migrate_to_bare(&plan)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print!("{}", bare_summary(&plan, &result));
        }

        Ok(())
    }
}

impl ToRegularArgs {
    /// Execute the to-regular command
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let path = repo_path(self.path.as_deref())?;
        let opts = config.migration_options(self.repo_name.clone());
        let plan = validate_migration_to_regular(&path, &opts)?;

        if self.dry_run {
            if self.json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_regular_plan(&plan);
            }
            return Ok(());
        }

        let result = migrate_to_regular(&plan)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print!("{}", regular_summary(&plan, &result));
        }

        Ok(())
    }
}

fn repo_path(path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}

fn print_bare_plan(plan: &MigrationPlan) {
    println!("Migration plan (regular -> bare)");
    println!("================================");
    println!();
    println!("Repository: {}", plan.repo_path.display());
    println!("Branch:     {}", plan.current_branch);
    if let Some(upstream) = &plan.upstream {
        println!("Upstream:   {}", upstream);
    }
    println!("Main:       {}", plan.main_worktree_path.display());
    print_worktrees(&plan.worktrees);
}

fn print_regular_plan(plan: &RegularMigrationPlan) {
    println!("Migration plan (bare -> regular)");
    println!("================================");
    println!();
    println!("Repository: {}", plan.repo_path.display());
    println!("Branch:     {}", plan.default_branch);
    if let Some(upstream) = &plan.upstream {
        println!("Upstream:   {}", upstream);
    }
    println!("From:       {}", plan.default_worktree_path.display());
    print_worktrees(&plan.worktrees);
}

fn print_worktrees(worktrees: &[WorktreeMigration]) {
    if worktrees.is_empty() {
        return;
    }

    println!();
    println!("Worktrees:");
    for wt in worktrees {
        let branch = wt.branch.as_deref().unwrap_or("(detached)");
        if wt.needs_move {
            println!(
                "  {} : {} -> {}",
                branch,
                wt.old_path.display(),
                wt.new_path.display()
            );
        } else {
            println!("  {} : {} (unchanged)", branch, wt.old_path.display());
        }
    }
}

fn bare_summary(plan: &MigrationPlan, result: &MigrateToBareResult) -> String {
    let mut out = format!("Converted {} to bare layout\n", plan.repo_path.display());
    out.push_str(&format!(
        "  Main worktree: {}\n",
        result.main_worktree_path.display()
    ));
    if !result.warnings.is_empty() {
        out.push_str(&format!(
            "  Completed with {} warning(s)\n",
            result.warnings.len()
        ));
    }
    out
}

fn regular_summary(plan: &RegularMigrationPlan, result: &MigrateToRegularResult) -> String {
    let mut out = format!(
        "Converted {} to regular layout on '{}'\n",
        result.repo_path.display(),
        plan.default_branch
    );
    if !result.warnings.is_empty() {
        out.push_str(&format!(
            "  Completed with {} warning(s)\n",
            result.warnings.len()
        ));
    }
    out
}
