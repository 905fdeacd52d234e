//! Execution phases, phase errors and best-effort warnings
//!
//! Executors run a fixed sequence of phases with no rollback. A failure
//! carries the phase it happened in, the path involved and, where one
//! exists, the git command that finishes or undoes the step by hand.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A step of `migrate_to_bare` or `migrate_to_regular`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Re-create `.git` through a temporary directory
    RelocateGitDir,
    /// Write `core.bare`
    ConfigureBare,
    /// Create the main worktree directory
    CreateMainWorktree,
    /// Move working files between the root and a worktree
    MoveFiles,
    /// Write `<gitdir>/worktrees/<name>/`
    WriteMetadata,
    /// Write a worktree's `.git` pointer file
    WriteGitLink,
    /// Move the staging index between the git directory and a worktree
    MoveIndex,
    /// Delete the default-branch worktree's metadata directory
    RemoveMetadata,
    /// Delete the emptied default-branch worktree directory
    RemoveWorktreeDir,
    /// Point the git directory's `HEAD` at the default branch
    WriteHead,
    /// Move and relink a secondary worktree
    UpdateWorktreeLinks,
    /// Final `git worktree repair`
    RepairWorktrees,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::RelocateGitDir => "relocate git directory",
            Phase::ConfigureBare => "configure core.bare",
            Phase::CreateMainWorktree => "create main worktree",
            Phase::MoveFiles => "move files",
            Phase::WriteMetadata => "write worktree metadata",
            Phase::WriteGitLink => "write .git link",
            Phase::MoveIndex => "move index",
            Phase::RemoveMetadata => "remove worktree metadata",
            Phase::RemoveWorktreeDir => "remove worktree directory",
            Phase::WriteHead => "write HEAD",
            Phase::UpdateWorktreeLinks => "update worktree links",
            Phase::RepairWorktrees => "repair worktrees",
        };
        f.write_str(name)
    }
}

/// A migration step that failed after mutation began
#[derive(Debug)]
pub struct PhaseError {
    /// Phase that failed
    pub phase: Phase,
    /// Repository or file path the phase was operating on
    pub path: PathBuf,
    /// Manual command that finishes or undoes the step
    pub remediation: Option<String>,
    /// Underlying failure
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl PhaseError {
    pub fn new(
        phase: Phase,
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            phase,
            path: path.into(),
            remediation: None,
            source: source.into(),
        }
    }

    /// Attach the manual command to run, executed from `dir`
    pub fn remediate(mut self, command: &str, dir: &Path) -> Self {
        self.remediation = Some(format!(
            "run '{}' manually from {}",
            command,
            dir.display()
        ));
        self
    }

    /// Attach a free-form recovery hint
    pub fn hint(mut self, text: impl Into<String>) -> Self {
        self.remediation = Some(text.into());
        self
    }
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Migration failed during '{}' at {}: {}",
            self.phase,
            self.path.display(),
            self.source
        )?;
        if let Some(remediation) = &self.remediation {
            write!(f, " ({})", remediation)?;
        }
        Ok(())
    }
}

impl std::error::Error for PhaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Extension for tagging fallible steps with their phase
pub(crate) trait PhaseContext<T> {
    fn phase(self, phase: Phase, path: &Path) -> std::result::Result<T, PhaseError>;
}

impl<T, E> PhaseContext<T> for std::result::Result<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn phase(self, phase: Phase, path: &Path) -> std::result::Result<T, PhaseError> {
        self.map_err(|e| PhaseError::new(phase, path, e))
    }
}

/// Kind of best-effort step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// Setting `remote.origin.fetch`
    FetchRefspec,
    /// Restoring a branch's upstream
    UpstreamRestore,
    /// Final `git worktree prune`
    Prune,
}

/// A best-effort step that failed without affecting the migration outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub(crate) fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        let warning = Self {
            kind,
            message: message.into(),
        };
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        warning
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
