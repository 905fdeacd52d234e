//! Blocking `git` subprocess invocation
//!
//! Worktree listing, repair and prune have no libgit2 equivalent that
//! matches the CLI, so those go through the `git` binary. Calls block
//! with no timeout.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use crate::{Error, Result};

/// Run `git <args>` in `dir` and return its stdout
pub fn run_git<S: AsRef<OsStr>>(dir: &Path, args: &[S]) -> Result<String> {
    let command = args
        .iter()
        .map(|a| a.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!(dir = %dir.display(), "git {}", command);

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| Error::Command {
            command: command.clone(),
            stderr: format!("failed to spawn git: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::Command { command, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run `git worktree repair` from `dir` for the given worktree paths
///
/// Paths are passed through as-is, so names that are not valid UTF-8 reach
/// git unchanged.
pub fn worktree_repair(dir: &Path, worktrees: &[&Path]) -> Result<()> {
    let mut args: Vec<&OsStr> = vec![OsStr::new("worktree"), OsStr::new("repair")];
    args.extend(worktrees.iter().map(|p| p.as_os_str()));

    run_git(dir, args.as_slice()).map(|_| ())
}

/// Run `git worktree prune` from `dir`
pub fn worktree_prune(dir: &Path) -> Result<()> {
    run_git(dir, &["worktree", "prune"]).map(|_| ())
}
