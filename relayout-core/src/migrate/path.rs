//! Worktree path templates and lexical path helpers

use std::path::{Component, Path, PathBuf};

/// Values substituted into a worktree path template
#[derive(Debug, Clone, Copy)]
pub struct PathContext<'a> {
    /// Repository root; relative templates resolve against it
    pub repo_root: &'a Path,
    /// `{repo}`
    pub repo_name: &'a str,
    /// `{origin}`, falls back to `{repo}`
    pub origin_name: Option<&'a str>,
}

/// Sanitize a branch name for use as a directory or metadata name
///
/// `feature/my-branch` becomes `feature-my-branch`.
pub fn sanitize_branch(branch: &str) -> String {
    branch.replace(['/', '\\', ':'], "-")
}

/// Compute the target path of the worktree for `branch`.
///
/// Supported placeholders are `{repo}`, `{branch}` and `{origin}`; anything
/// else is left verbatim. The result is absolute and lexically normalized.
pub fn resolve_worktree_path(template: &str, ctx: &PathContext<'_>, branch: &str) -> PathBuf {
    let rendered = template
        .replace("{repo}", ctx.repo_name)
        .replace("{origin}", ctx.origin_name.unwrap_or(ctx.repo_name))
        .replace("{branch}", &sanitize_branch(branch));

    normalize_path(&ctx.repo_root.join(rendered))
}

/// Remove `.` and `..` components without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Path from directory `from` to `to`; both must be absolute and normalized
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for component in &to[common..] {
        rel.push(component);
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}
