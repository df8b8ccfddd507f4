//! Per-job scratch space that is removed on every exit path.
//!
//! Artifacts are registered as they are created and removed in reverse
//! registration order, so files go before the directories holding them.
//! Removal failures are logged and never propagated. Dropping an unreleased
//! scope releases it, which covers early returns and panics.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
enum Artifact {
    File(PathBuf),
    Dir(PathBuf),
}

impl Artifact {
    fn path(&self) -> &Path {
        match self {
            Self::File(p) | Self::Dir(p) => p,
        }
    }

    fn remove(&self) -> io::Result<()> {
        match self {
            Self::File(p) => std::fs::remove_file(p),
            Self::Dir(p) => std::fs::remove_dir_all(p),
        }
    }
}

/// Outcome of releasing a [`CleanupScope`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Artifacts removed.
    pub removed: usize,
    /// Artifacts that were already gone.
    pub missing: usize,
    /// Artifacts that could not be removed.
    pub failed: usize,
}

/// Tracks the temporary artifacts of one job.
#[derive(Debug)]
pub struct CleanupScope {
    dir: PathBuf,
    artifacts: Vec<Artifact>,
    released: bool,
}

impl CleanupScope {
    /// Create a fresh `job_<uuid>` directory under `base` and track it.
    pub fn in_dir(base: &Path) -> io::Result<Self> {
        let dir = base.join(format!("job_{}", Uuid::now_v7().simple()));
        std::fs::create_dir_all(&dir)?;
        debug!(?dir, "created job directory");
        Ok(Self {
            artifacts: vec![Artifact::Dir(dir.clone())],
            dir,
            released: false,
        })
    }

    /// The job's scratch directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Track a file for removal.
    pub fn register_file(&mut self, path: impl Into<PathBuf>) {
        self.artifacts.push(Artifact::File(path.into()));
    }

    /// Create a subdirectory of the scratch directory and track it.
    pub fn create_subdir(&mut self, name: &str) -> io::Result<PathBuf> {
        let path = self.dir.join(name);
        std::fs::create_dir_all(&path)?;
        self.artifacts.push(Artifact::Dir(path.clone()));
        Ok(path)
    }

    /// Number of tracked artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Remove every tracked artifact. Safe to call more than once.
    pub fn release(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        if self.released {
            return report;
        }
        self.released = true;

        for artifact in self.artifacts.drain(..).rev() {
            match artifact.remove() {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => report.missing += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(path = ?artifact.path(), error = %e, "failed to clean up artifact");
                }
            }
        }

        debug!(
            removed = report.removed,
            missing = report.missing,
            failed = report.failed,
            "job cleanup finished"
        );
        report
    }
}

impl Drop for CleanupScope {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
