//! Per-invocation scratch directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, warn};
use uuid::Uuid;

/// Scratch directory named `mapt-<pid>-<uuid>`, removed on drop unless kept
#[derive(Debug)]
pub struct WorkDir {
    dir: Option<TempDir>,
    path: PathBuf,
    keep: bool,
}

impl WorkDir {
    /// Create under the system temp directory
    pub fn create(keep: bool) -> io::Result<Self> {
        Self::create_in(&std::env::temp_dir(), keep)
    }

    pub fn create_in(parent: &Path, keep: bool) -> io::Result<Self> {
        let name = format!("mapt-{}-{}", std::process::id(), Uuid::new_v4().simple());
        let dir = tempfile::Builder::new()
            .prefix(&name)
            .rand_bytes(0)
            .tempdir_in(parent)?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Write `contents` to `name` inside the directory
    pub fn write(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn keeps_files(&self) -> bool {
        self.keep
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.keep {
            let path = dir.keep();
            info!(path = %path.display(), "keeping build files");
        } else if let Err(e) = dir.close() {
            warn!(path = %self.path.display(), error = %e, "failed to remove build files");
        }
    }
}
