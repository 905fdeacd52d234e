//! Doctor command - check worktree links

use std::path::PathBuf;

use clap::Args;
use relayout_core::migrate::repair_worktrees;
use relayout_core::{diagnose_worktrees, inspect, Layout, LinkStatus};

/// Check every worktree's `.git` link and metadata back-pointer
#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Repository root (defaults to the current directory)
    pub path: Option<PathBuf>,

    /// Run `git worktree repair` on repairable worktrees
    #[arg(long)]
    pub repair: bool,
}

impl DoctorArgs {
    /// Execute the doctor command
    pub fn execute(&self) -> anyhow::Result<()> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => std::env::current_dir()?,
        };
        let repo = inspect(&path)?;
        let reports = diagnose_worktrees(&repo.git_dir)?;

        println!("Repository: {} ({})", repo.path.display(), repo.layout);
        if reports.is_empty() {
            println!("No linked worktrees.");
            return Ok(());
        }

        for report in &reports {
            let status = match report.status {
                LinkStatus::Valid => "ok",
                LinkStatus::Repairable => "repairable",
                LinkStatus::Missing => "missing",
            };
            let worktree = report
                .worktree
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unknown)".to_string());
            println!("  {} [{}] {}", report.name, status, worktree);
        }

        let repairable: Vec<&PathBuf> = reports
            .iter()
            .filter(|r| r.status == LinkStatus::Repairable)
            .filter_map(|r| r.worktree.as_ref())
            .collect();

        if repairable.is_empty() {
            return Ok(());
        }

        if !self.repair {
            println!();
            println!(
                "{} worktree(s) can be repaired; rerun with --repair",
                repairable.len()
            );
            return Ok(());
        }

        let dir = match repo.layout {
            Layout::Regular => &repo.path,
            Layout::Bare => &repo.git_dir,
        };
        let paths: Vec<&std::path::Path> = repairable.iter().map(|p| p.as_path()).collect();
        repair_worktrees(dir, &paths)?;
        println!("Repaired {} worktree(s).", paths.len());

        Ok(())
    }
}
