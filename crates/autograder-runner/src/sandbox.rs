//! Scratch copies of a submission for running student commands.

use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::process::Command;

/// A throwaway copy of the submission directory.
///
/// Commands run here so one question cannot change the files another question
/// sees. On drop, the temporary directory is removed.
pub struct Sandbox {
    work_dir: TempDir,
    scrub_env: Vec<String>,
}

impl Sandbox {
    /// Copy the tree under `submission_root` into a fresh temporary directory.
    ///
    /// The copy runs on the blocking pool so a large submission does not
    /// stall the runtime driving the question's deadline.
    pub async fn from_submission(submission_root: &Path, scrub_env: &[String]) -> Result<Self> {
        let root = submission_root.to_path_buf();
        let work_dir = tokio::task::spawn_blocking(move || -> Result<TempDir> {
            let work_dir = TempDir::new().context("failed to create temp directory")?;
            copy_tree(&root, work_dir.path()).with_context(|| {
                format!("failed to copy submission {} into sandbox", root.display())
            })?;
            Ok(work_dir)
        })
        .await
        .context("sandbox copy did not finish")??;

        Ok(Self {
            work_dir,
            scrub_env: scrub_env.to_vec(),
        })
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    /// Point `cmd` at the sandbox and strip sensitive variables from its
    /// environment.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.current_dir(self.work_dir.path());
        for var in &self.scrub_env {
            cmd.env_remove(var);
        }
    }
}

/// Recursively copy regular files and directories. Symlinks are skipped so a
/// submission cannot smuggle in references to files outside its tree.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in std::fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_symlink() {
            tracing::warn!("skipping symlink in submission: {}", path.display());
        } else if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
            copy_tree(&path, &target)?;
        } else {
            std::fs::copy(&path, &target)
                .with_context(|| format!("failed to copy {}", path.display()))?;
        }
    }
    Ok(())
}
