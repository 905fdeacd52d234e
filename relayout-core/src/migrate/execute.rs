//! Migration execution
//!
//! Each executor runs its phases in order against a plan from the matching
//! planner. Nothing is rolled back: a failure in phase k leaves the changes
//! of phases 1..k on disk and the returned `PhaseError` names what to run
//! by hand. Best-effort steps only add to the warning list.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::links::update_worktree_links;
use super::path::relative_path;
use super::phase::{Phase, PhaseContext, PhaseError, Warning, WarningKind};
use super::plan::{MigrationPlan, RegularMigrationPlan, WorktreeMigration};
use crate::git::{worktree_prune, worktree_repair, write_gitdir_file, GitRepo};
use crate::Result;

/// Fetch refspec that tracks every remote branch
pub const ORIGIN_FETCH_REFSPEC: &str = "+refs/heads/*:refs/remotes/origin/*";

/// Outcome of `migrate_to_bare`
#[derive(Debug, Clone, Serialize)]
pub struct MigrateToBareResult {
    /// Where the former root checkout now lives
    pub main_worktree_path: PathBuf,
    pub warnings: Vec<Warning>,
}

/// Outcome of `migrate_to_regular`
#[derive(Debug, Clone, Serialize)]
pub struct MigrateToRegularResult {
    /// Repository root, now the default branch checkout
    pub repo_path: PathBuf,
    pub warnings: Vec<Warning>,
}

/// Convert a regular repository to the bare-in-.git layout
pub fn migrate_to_bare(plan: &MigrationPlan) -> Result<MigrateToBareResult> {
    let root = &plan.repo_path;
    let git_dir = &plan.git_dir;
    let main = &plan.main_worktree_path;
    let mut warnings = Vec::new();

    tracing::info!(repo = %root.display(), "Converting repository to bare layout");

    tracing::info!(phase = %Phase::RelocateGitDir, "Starting phase");
    relocate_git_dir(root, git_dir)?;

    tracing::info!(phase = %Phase::ConfigureBare, "Starting phase");
    set_core_bare(git_dir, true)?;
    if let Some(warning) = configure_fetch_refspec(git_dir) {
        warnings.push(warning);
    }

    tracing::info!(phase = %Phase::CreateMainWorktree, path = %main.display(), "Starting phase");
    fs::create_dir_all(main).phase(Phase::CreateMainWorktree, main)?;

    tracing::info!(phase = %Phase::MoveFiles, "Starting phase");
    move_root_into_main(plan)?;

    tracing::info!(phase = %Phase::WriteMetadata, name = %plan.main_metadata_name, "Starting phase");
    let metadata_dir = git_dir.join("worktrees").join(&plan.main_metadata_name);
    write_main_metadata(plan, &metadata_dir)?;

    tracing::info!(phase = %Phase::WriteGitLink, "Starting phase");
    let dot_git = main.join(".git");
    write_gitdir_file(&dot_git, &relative_path(main, &metadata_dir))
        .phase(Phase::WriteGitLink, &dot_git)
        .map_err(|e| e.remediate(&format!("git worktree repair {}", main.display()), git_dir))?;

    tracing::info!(phase = %Phase::UpdateWorktreeLinks, count = plan.worktrees.len(), "Starting phase");
    for wt in &plan.worktrees {
        update_worktree_links(root, wt)?;
    }

    tracing::info!(phase = %Phase::RepairWorktrees, "Starting phase");
    let mut paths: Vec<&Path> = vec![main.as_path()];
    paths.extend(plan.worktrees.iter().map(|wt| wt.new_path.as_path()));
    repair(git_dir, &paths)?;

    let mut upstreams = vec![(plan.current_branch.as_str(), plan.upstream.as_deref())];
    upstreams.extend(branch_upstreams(&plan.worktrees));
    warnings.extend(restore_upstreams(git_dir, &upstreams));

    tracing::info!(main = %main.display(), "Repository converted to bare layout");

    Ok(MigrateToBareResult {
        main_worktree_path: main.clone(),
        warnings,
    })
}

/// Convert a bare-in-.git repository back to the regular layout
pub fn migrate_to_regular(plan: &RegularMigrationPlan) -> Result<MigrateToRegularResult> {
    let root = &plan.repo_path;
    let git_dir = &plan.git_dir;
    let default_wt = &plan.default_worktree_path;
    let metadata_dir = git_dir.join("worktrees").join(&plan.default_metadata_name);
    let mut warnings = Vec::new();

    tracing::info!(repo = %root.display(), "Converting repository to regular layout");

    tracing::info!(phase = %Phase::MoveFiles, from = %default_wt.display(), "Starting phase");
    move_entries(default_wt, root, |_| false)?;

    tracing::info!(phase = %Phase::MoveIndex, "Starting phase");
    let index = metadata_dir.join("index");
    if index.exists() {
        fs::rename(&index, git_dir.join("index")).phase(Phase::MoveIndex, &index)?;
    }

    tracing::info!(phase = %Phase::RemoveMetadata, name = %plan.default_metadata_name, "Starting phase");
    if metadata_dir.exists() {
        fs::remove_dir_all(&metadata_dir).phase(Phase::RemoveMetadata, &metadata_dir)?;
    }

    tracing::info!(phase = %Phase::RemoveWorktreeDir, path = %default_wt.display(), "Starting phase");
    remove_worktree_dir(root, default_wt)?;

    tracing::info!(phase = %Phase::ConfigureBare, "Starting phase");
    set_core_bare(git_dir, false)?;

    tracing::info!(phase = %Phase::WriteHead, branch = %plan.default_branch, "Starting phase");
    let head = git_dir.join("HEAD");
    fs::write(&head, format!("ref: refs/heads/{}\n", plan.default_branch))
        .phase(Phase::WriteHead, &head)?;

    tracing::info!(phase = %Phase::UpdateWorktreeLinks, count = plan.worktrees.len(), "Starting phase");
    for wt in &plan.worktrees {
        update_worktree_links(root, wt)?;
    }

    tracing::info!(phase = %Phase::RepairWorktrees, "Starting phase");
    let paths: Vec<&Path> = plan.worktrees.iter().map(|wt| wt.new_path.as_path()).collect();
    repair(root, &paths)?;

    let mut upstreams = vec![(plan.default_branch.as_str(), plan.upstream.as_deref())];
    upstreams.extend(branch_upstreams(&plan.worktrees));
    warnings.extend(restore_upstreams(git_dir, &upstreams));

    // Clears references left behind by the deleted metadata directory
    if let Err(e) = worktree_prune(root) {
        warnings.push(Warning::new(
            WarningKind::Prune,
            format!(
                "git worktree prune failed: {}. Run 'git worktree prune' manually from {}",
                e,
                root.display()
            ),
        ));
    }

    tracing::info!(repo = %root.display(), "Repository converted to regular layout");

    Ok(MigrateToRegularResult {
        repo_path: root.clone(),
        warnings,
    })
}

/// Rebuild `.git` through a sibling temporary directory
fn relocate_git_dir(root: &Path, git_dir: &Path) -> std::result::Result<(), PhaseError> {
    let phase = Phase::RelocateGitDir;
    let staging = tempfile::Builder::new()
        .prefix(".git-relayout-")
        .tempdir_in(root)
        .phase(phase, root)?
        .keep();

    let stranded = |e: PhaseError| {
        e.hint(format!(
            "repository data may be in {}; move its contents back into {}",
            staging.display(),
            git_dir.display()
        ))
    };

    move_entries(git_dir, &staging, |_| false)
        .map_err(|e| PhaseError { phase, ..e })
        .map_err(stranded)?;
    fs::remove_dir(git_dir)
        .phase(phase, git_dir)
        .map_err(stranded)?;
    fs::rename(&staging, git_dir)
        .phase(phase, &staging)
        .map_err(stranded)?;

    Ok(())
}

fn set_core_bare(git_dir: &Path, bare: bool) -> std::result::Result<(), PhaseError> {
    let config_path = git_dir.join("config");
    git2::Config::open(&config_path)
        .and_then(|mut config| config.set_bool("core.bare", bare))
        .phase(Phase::ConfigureBare, &config_path)
        .map_err(|e| e.remediate(&format!("git config core.bare {}", bare), git_dir))
}

/// Make `origin` fetch every branch; worktrees of other branches need them
fn configure_fetch_refspec(git_dir: &Path) -> Option<Warning> {
    let result = git2::Config::open(&git_dir.join("config")).and_then(|mut config| {
        if config.get_string("remote.origin.url").is_err() {
            return Ok(false);
        }
        config.set_multivar("remote.origin.fetch", ".*", ORIGIN_FETCH_REFSPEC)?;
        Ok(true)
    });

    match result {
        Ok(true) => {
            tracing::debug!(refspec = ORIGIN_FETCH_REFSPEC, "Configured origin fetch refspec");
            None
        }
        Ok(false) => None,
        Err(e) => Some(Warning::new(
            WarningKind::FetchRefspec,
            format!(
                "Could not set remote.origin.fetch: {}. Run 'git config remote.origin.fetch \"{}\"' manually",
                e, ORIGIN_FETCH_REFSPEC
            ),
        )),
    }
}

/// Move the root's top-level entries into the main worktree, leaving
/// `.git`, the main worktree itself and other worktrees in place
fn move_root_into_main(plan: &MigrationPlan) -> std::result::Result<(), PhaseError> {
    let main = &plan.main_worktree_path;
    move_entries(&plan.repo_path, main, |path| {
        main.starts_with(path)
            || plan
                .worktrees
                .iter()
                .any(|wt| wt.old_path.starts_with(path))
    })
}

/// Rename every entry of `from` except `.git` into `to`
fn move_entries(
    from: &Path,
    to: &Path,
    skip: impl Fn(&Path) -> bool,
) -> std::result::Result<(), PhaseError> {
    let phase = Phase::MoveFiles;
    let entries = fs::read_dir(from)
        .and_then(|iter| iter.collect::<std::io::Result<Vec<_>>>())
        .phase(phase, from)?;

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name();
        if name == ".git" || skip(&path) {
            continue;
        }
        let target = to.join(&name);
        tracing::debug!(from = %path.display(), to = %target.display(), "Moving");
        fs::rename(&path, &target).phase(phase, &path)?;
    }
    Ok(())
}

/// Hand-build `<gitdir>/worktrees/<name>/` for the new main worktree
fn write_main_metadata(
    plan: &MigrationPlan,
    metadata_dir: &Path,
) -> std::result::Result<(), PhaseError> {
    let phase = Phase::WriteMetadata;
    let dot_git = plan.main_worktree_path.join(".git");

    fs::create_dir_all(metadata_dir).phase(phase, metadata_dir)?;
    let files = [
        ("HEAD", format!("ref: refs/heads/{}\n", plan.current_branch)),
        ("gitdir", format!("{}\n", dot_git.display())),
        ("commondir", "../..\n".to_string()),
    ];
    for (name, contents) in files {
        let path = metadata_dir.join(name);
        fs::write(&path, contents).phase(phase, &path)?;
    }

    // Moving the index keeps staged changes exactly as they were
    let index = plan.git_dir.join("index");
    if index.exists() {
        fs::rename(&index, metadata_dir.join("index")).phase(Phase::MoveIndex, &index)?;
    }

    let logs = metadata_dir.join("logs");
    fs::create_dir_all(&logs).phase(phase, &logs)?;
    Ok(())
}

/// Remove the emptied default worktree and any parents it leaves empty
fn remove_worktree_dir(root: &Path, worktree: &Path) -> std::result::Result<(), PhaseError> {
    let phase = Phase::RemoveWorktreeDir;
    let dot_git = worktree.join(".git");
    if dot_git.exists() {
        fs::remove_file(&dot_git).phase(phase, &dot_git)?;
    }
    fs::remove_dir(worktree).phase(phase, worktree)?;

    let mut parent = worktree.parent();
    while let Some(dir) = parent {
        if dir == root || !dir.starts_with(root) || fs::remove_dir(dir).is_err() {
            break;
        }
        parent = dir.parent();
    }
    Ok(())
}

fn repair(dir: &Path, worktrees: &[&Path]) -> std::result::Result<(), PhaseError> {
    worktree_repair(dir, worktrees)
        .phase(Phase::RepairWorktrees, dir)
        .map_err(|e| e.remediate("git worktree repair", dir))
}

fn branch_upstreams(worktrees: &[WorktreeMigration]) -> Vec<(&str, Option<&str>)> {
    worktrees
        .iter()
        .filter_map(|wt| Some((wt.branch.as_deref()?, wt.upstream.as_deref())))
        .collect()
}

/// Re-point each branch at its recorded upstream where it no longer is.
///
/// Branches whose remote-tracking branch is gone are skipped.
fn restore_upstreams(git_dir: &Path, branches: &[(&str, Option<&str>)]) -> Vec<Warning> {
    let git = match GitRepo::open(git_dir) {
        Ok(git) => git,
        Err(e) => {
            return vec![Warning::new(
                WarningKind::UpstreamRestore,
                format!("Could not open {} to restore upstreams: {}", git_dir.display(), e),
            )]
        }
    };

    let mut warnings = Vec::new();
    for &(branch, upstream) in branches {
        let Some(upstream) = upstream else {
            continue;
        };
        if git.upstream(branch).as_deref() == Some(upstream) {
            continue;
        }
        if !git.remote_branch_exists(upstream) {
            tracing::debug!(branch, upstream, "Upstream no longer exists, skipping");
            continue;
        }
        if let Err(e) = git.set_upstream(branch, upstream) {
            warnings.push(Warning::new(
                WarningKind::UpstreamRestore,
                format!(
                    "Could not restore upstream of '{}': {}. Run 'git branch --set-upstream-to={} {}' manually",
                    branch, e, upstream, branch
                ),
            ));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{detect_layout, Layout};
    use crate::migrate::{
        is_worktree_link_valid, validate_migration, validate_migration_to_regular,
        MigrationOptions,
    };
    use crate::test_support::{git, listing, snapshot, status, TestRepo};
    use crate::Error;

    fn opts(format: &str) -> MigrationOptions {
        MigrationOptions::new(format)
    }

    fn branch_of(worktree: &Path) -> String {
        git(worktree, &["rev-parse", "--abbrev-ref", "HEAD"])
            .trim()
            .to_string()
    }

    /// Staged, unstaged and untracked changes on top of the seed commit
    fn dirty(root: &Path) {
        fs::write(root.join("staged.txt"), "staged\n").unwrap();
        git(root, &["add", "staged.txt"]);
        fs::write(root.join("notes.txt"), "modified notes\n").unwrap();
        fs::write(root.join("untracked.txt"), "untracked\n").unwrap();
    }

    #[test]
    fn test_round_trip_preserves_working_state() {
        let repo = TestRepo::cloned();
        dirty(&repo.root);

        let files_before = snapshot(&repo.root);
        let listing_before = listing(&repo.root);
        let status_before = status(&repo.root);
        assert_eq!(status_before.len(), 3);

        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        let result = migrate_to_bare(&plan).unwrap();
        let main = repo.root.join("main");
        assert_eq!(result.main_worktree_path, main);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);

        assert_eq!(detect_layout(&repo.root).unwrap(), Layout::Bare);
        assert_eq!(listing(&repo.root), vec![".git", "main"]);
        assert_eq!(snapshot(&main), files_before);
        assert_eq!(status(&main), status_before);
        assert_eq!(branch_of(&main), "main");
        assert!(is_worktree_link_valid(&main));

        let plan = validate_migration_to_regular(&repo.root, &opts("{branch}")).unwrap();
        assert_eq!(plan.default_branch, "main");
        assert_eq!(plan.default_worktree_path, main);
        let result = migrate_to_regular(&plan).unwrap();
        assert_eq!(result.repo_path, repo.root);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);

        assert_eq!(detect_layout(&repo.root).unwrap(), Layout::Regular);
        assert_eq!(listing(&repo.root), listing_before);
        assert_eq!(snapshot(&repo.root), files_before);
        assert_eq!(status(&repo.root), status_before);
        assert!(!repo.root.join(".git/worktrees/main").exists());
    }

    #[test]
    fn test_main_metadata_files() {
        let repo = TestRepo::local();
        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        migrate_to_bare(&plan).unwrap();

        let metadata = repo.root.join(".git/worktrees/main");
        assert_eq!(
            fs::read_to_string(metadata.join("HEAD")).unwrap(),
            "ref: refs/heads/main\n"
        );
        assert_eq!(
            fs::read_to_string(metadata.join("commondir")).unwrap(),
            "../..\n"
        );
        assert_eq!(
            fs::read_to_string(metadata.join("gitdir")).unwrap(),
            format!("{}\n", repo.root.join("main/.git").display())
        );
        assert!(metadata.join("index").is_file());
        assert!(metadata.join("logs").is_dir());
        assert!(!repo.root.join(".git/index").exists());

        let config = git2::Config::open(&repo.root.join(".git/config")).unwrap();
        assert!(config.get_bool("core.bare").unwrap());

        let leftovers: Vec<String> = listing(&repo.root)
            .into_iter()
            .filter(|n| n.starts_with(".git-relayout-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_secondary_worktree_branch_fidelity() {
        let repo = TestRepo::cloned();
        let feature = repo.add_worktree("feature/my-branch", "wt-feature");
        repo.push_upstream(&feature, "feature/my-branch");

        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        migrate_to_bare(&plan).unwrap();

        let moved = repo.root.join("feature-my-branch");
        assert!(!feature.exists());
        assert_eq!(branch_of(&moved), "feature/my-branch");
        assert_eq!(branch_of(&repo.root.join("main")), "main");
        assert!(repo.root.join(".git/worktrees/feature-my-branch").is_dir());
        assert!(!repo.root.join(".git/worktrees/wt-feature").exists());
        assert!(is_worktree_link_valid(&moved));

        let git_repo = GitRepo::open(&repo.root.join(".git")).unwrap();
        assert_eq!(
            git_repo.upstream("feature/my-branch").as_deref(),
            Some("origin/feature/my-branch")
        );

        let plan = validate_migration_to_regular(&repo.root, &opts("{branch}")).unwrap();
        assert_eq!(plan.worktrees.len(), 1);
        assert!(!plan.worktrees[0].needs_move);
        migrate_to_regular(&plan).unwrap();

        assert_eq!(branch_of(&repo.root), "main");
        assert_eq!(branch_of(&moved), "feature/my-branch");
        assert!(is_worktree_link_valid(&moved));
    }

    #[test]
    fn test_upstream_preserved_and_restored() {
        let repo = TestRepo::cloned();
        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        assert_eq!(plan.upstream.as_deref(), Some("origin/main"));

        // Lost between planning and execution; the plan still carries it
        git(&repo.root, &["branch", "--unset-upstream"]);
        migrate_to_bare(&plan).unwrap();

        let git_repo = GitRepo::open(&repo.root.join(".git")).unwrap();
        assert_eq!(git_repo.upstream("main").as_deref(), Some("origin/main"));

        let plan = validate_migration_to_regular(&repo.root, &opts("{branch}")).unwrap();
        migrate_to_regular(&plan).unwrap();

        let git_repo = GitRepo::open(&repo.root).unwrap();
        assert_eq!(git_repo.upstream("main").as_deref(), Some("origin/main"));
    }

    #[test]
    fn test_fetch_refspec_configured() {
        let repo = TestRepo::cloned();
        git(&repo.root, &["config", "remote.origin.fetch", "+refs/heads/main:refs/remotes/origin/main"]);

        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        migrate_to_bare(&plan).unwrap();

        let fetch = git(&repo.root.join("main"), &["config", "--get", "remote.origin.fetch"]);
        assert_eq!(fetch.trim(), ORIGIN_FETCH_REFSPEC);
    }

    #[test]
    fn test_already_bare_rejected_without_mutation() {
        let repo = TestRepo::local();
        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        migrate_to_bare(&plan).unwrap();

        let before = listing(&repo.root);
        let err = validate_migration(&repo.root, &opts("{branch}")).unwrap_err();
        assert!(matches!(err, Error::AlreadyBare(_)));
        assert!(err.to_string().contains("already using bare structure"));
        assert_eq!(listing(&repo.root), before);
    }

    #[test]
    fn test_no_default_branch_worktree_lists_available() {
        let repo = TestRepo::cloned();
        repo.add_worktree("feature/x", "wt-x");
        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        migrate_to_bare(&plan).unwrap();

        git(
            &repo.root.join(".git"),
            &["worktree", "remove", "--force", repo.root.join("main").to_str().unwrap()],
        );

        let err = validate_migration_to_regular(&repo.root, &opts("{branch}")).unwrap_err();
        match err {
            Error::NoDefaultBranchWorktree { branch, available } => {
                assert_eq!(branch, "main");
                assert_eq!(available, vec!["feature/x".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_worktree_name_conflict() {
        let repo = TestRepo::cloned();
        repo.add_worktree("docs", "wt-docs");
        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        migrate_to_bare(&plan).unwrap();
        assert!(repo.root.join("docs").is_dir());

        fs::write(repo.root.join("main/docs"), "would collide\n").unwrap();

        let err = validate_migration_to_regular(&repo.root, &opts("{branch}")).unwrap_err();
        match err {
            Error::FileWorktreeNameConflict { file, worktree } => {
                assert_eq!(file, "docs");
                assert_eq!(worktree, repo.root.join("docs"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(repo.root.join("main/docs").is_file());
    }

    #[test]
    fn test_worktree_nested_in_default_worktree_rejected() {
        let repo = TestRepo::local();
        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        migrate_to_bare(&plan).unwrap();

        let nested = repo.root.join("main/nested");
        git(
            &repo.root.join(".git"),
            &["worktree", "add", "-q", "-b", "topic", nested.to_str().unwrap()],
        );
        let before = listing(&repo.root);

        let err = validate_migration_to_regular(&repo.root, &opts("{branch}")).unwrap_err();
        match err {
            Error::FileWorktreeNameConflict { file, worktree } => {
                assert_eq!(file, "nested");
                assert_eq!(worktree, nested);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(still_bare_and_unchanged(&repo.root, &before));
        assert!(is_worktree_link_valid(&nested));
    }

    fn still_bare_and_unchanged(root: &Path, before: &[String]) -> bool {
        let config = git2::Config::open(&root.join(".git/config")).unwrap();
        listing(root) == before && config.get_bool("core.bare").unwrap()
    }

    #[test]
    fn test_missing_remote_branch_skips_upstream_restore() {
        let repo = TestRepo::cloned();
        let feature = repo.add_worktree("feature/x", "wt-x");
        repo.push_upstream(&feature, "feature/x");

        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        assert_eq!(
            plan.worktrees[0].upstream.as_deref(),
            Some("origin/feature/x")
        );

        git(&repo.root, &["update-ref", "-d", "refs/remotes/origin/feature/x"]);
        let result = migrate_to_bare(&plan).unwrap();

        assert!(result
            .warnings
            .iter()
            .all(|w| w.kind != WarningKind::UpstreamRestore));
        assert_eq!(branch_of(&repo.root.join("feature-x")), "feature/x");
    }

    #[test]
    fn test_failed_upstream_restore_becomes_warning() {
        let repo = TestRepo::cloned();
        let plan = validate_migration(&repo.root, &opts("{branch}")).unwrap();
        migrate_to_bare(&plan).unwrap();

        let git_dir = repo.root.join(".git");
        let plan = validate_migration_to_regular(&repo.root, &opts("{branch}")).unwrap();
        assert_eq!(plan.upstream.as_deref(), Some("origin/main"));

        // No fetch refspec maps refs/remotes/origin/main back to origin
        git(&git_dir, &["branch", "--unset-upstream", "main"]);
        git(
            &git_dir,
            &[
                "config",
                "remote.origin.fetch",
                "+refs/heads/other:refs/remotes/origin/other",
            ],
        );

        let result = migrate_to_regular(&plan).unwrap();
        assert_eq!(detect_layout(&repo.root).unwrap(), Layout::Regular);

        let upstream_warnings: Vec<&Warning> = result
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::UpstreamRestore)
            .collect();
        assert_eq!(upstream_warnings.len(), 1);
        assert!(upstream_warnings[0].message.contains("'main'"));
    }

    #[test]
    fn test_restore_upstreams_reports_unknown_branch() {
        let repo = TestRepo::cloned();
        let git_dir = repo.root.join(".git");

        let warnings = restore_upstreams(&git_dir, &[("no-such-branch", Some("origin/main"))]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::UpstreamRestore);

        let warnings = restore_upstreams(&git_dir, &[("main", Some("origin/gone"))]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_sibling_layout_round_trip() {
        let repo = TestRepo::local();
        let topic = repo.add_worktree("topic", "wt-topic");

        let plan = validate_migration(&repo.root, &opts("../{repo}-{branch}")).unwrap();
        let result = migrate_to_bare(&plan).unwrap();
        assert_eq!(result.main_worktree_path, repo.base.join("work-main"));
        assert_eq!(listing(&repo.root), vec![".git"]);
        assert!(!topic.exists());
        assert_eq!(branch_of(&repo.base.join("work-topic")), "topic");

        let plan = validate_migration_to_regular(&repo.root, &opts("../{repo}-{branch}")).unwrap();
        migrate_to_regular(&plan).unwrap();
        assert!(!repo.base.join("work-main").exists());
        assert_eq!(branch_of(&repo.root), "main");
        assert_eq!(branch_of(&repo.base.join("work-topic")), "topic");
    }

    #[test]
    fn test_execution_failure_reports_phase() {
        let repo = TestRepo::local();
        repo.add_worktree("topic", "wt-topic");
        let plan = validate_migration(&repo.root, &opts("../{repo}-{branch}")).unwrap();

        // Occupied after planning; execution does not re-check
        let target = repo.base.join("work-topic");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("blocker"), "x").unwrap();

        let err = migrate_to_bare(&plan).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::UpdateWorktreeLinks));
        assert!(!err.is_validation());
        match err {
            Error::Phase(phase_err) => {
                let remediation = phase_err.remediation.unwrap();
                assert!(remediation.contains("git worktree move"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
