//! Scratch repositories for tests

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Run git with a fixed identity and return stdout, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A repository in a temporary directory
pub struct TestRepo {
    _dir: TempDir,
    /// Directory holding the repository and any sibling worktrees
    pub base: PathBuf,
    /// Repository root
    pub root: PathBuf,
}

impl TestRepo {
    /// A repository with one commit on `main` and no remote
    pub fn local() -> Self {
        let dir = TempDir::new().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();
        let root = base.join("work");
        fs::create_dir(&root).unwrap();

        git(&root, &["init", "-q"]);
        seed_files(&root);
        git(&root, &["add", "."]);
        git(&root, &["commit", "-q", "-m", "initial"]);

        Self {
            _dir: dir,
            base,
            root,
        }
    }

    /// A clone of a local bare remote, with `origin/HEAD` and `main`
    /// tracking `origin/main`
    pub fn cloned() -> Self {
        let dir = TempDir::new().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();

        let seed = base.join("seed");
        fs::create_dir(&seed).unwrap();
        git(&seed, &["init", "-q"]);
        seed_files(&seed);
        git(&seed, &["add", "."]);
        git(&seed, &["commit", "-q", "-m", "initial"]);
        git(&base, &["clone", "-q", "--bare", "seed", "remote.git"]);
        git(&base, &["clone", "-q", "remote.git", "work"]);

        Self {
            _dir: dir,
            root: base.join("work"),
            base,
        }
    }

    /// Add a worktree on a new branch at `<base>/<dir_name>`
    pub fn add_worktree(&self, branch: &str, dir_name: &str) -> PathBuf {
        let path = self.base.join(dir_name);
        git(
            &self.root,
            &["worktree", "add", "-q", "-b", branch, path.to_str().unwrap()],
        );
        path
    }

    /// Push a branch to origin and track it
    pub fn push_upstream(&self, worktree: &Path, branch: &str) {
        git(worktree, &["push", "-q", "-u", "origin", branch]);
    }
}

fn seed_files(root: &Path) {
    fs::write(root.join("README.md"), "# widget\n").unwrap();
    fs::create_dir(root.join("src")).unwrap();
    fs::write(root.join("src/lib.txt"), "one\ntwo\n").unwrap();
    fs::write(root.join("notes.txt"), "tracked notes\n").unwrap();
}

/// Files under `dir` (skipping `.git`) mapped to their contents
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    collect(dir, dir, &mut files);
    files
}

fn collect(base: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        if entry.file_name() == ".git" {
            continue;
        }
        if path.is_dir() {
            collect(base, &path, files);
        } else {
            let rel = path.strip_prefix(base).unwrap().to_path_buf();
            files.insert(rel, fs::read(&path).unwrap());
        }
    }
}

/// Sorted top-level entry names of `dir`
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// `git status --porcelain` with lines sorted
pub fn status(dir: &Path) -> Vec<String> {
    let mut lines: Vec<String> = git(dir, &["status", "--porcelain"])
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}
