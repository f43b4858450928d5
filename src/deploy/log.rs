// ABOUTME: Append-only per-deployment text logs, file-backed under a state directory.
// ABOUTME: Lazily created on first write; readers get a sentinel until then.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::types::DeploymentId;

/// What observers see before any log line has been written.
pub const NO_ACTIVITY: &str = "Waiting for action to start";

/// Errors from the deployment log store.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to write log line: {0}")]
    Write(std::io::Error),

    #[error("failed to read log: {0}")]
    Read(std::io::Error),
}

/// Hands out per-deployment logs rooted at a state directory.
///
/// Writers for the same deployment share a lock, so concurrent writes append
/// whole lines in arrival order.
pub struct LogDirectory {
    root: PathBuf,
    locks: Mutex<HashMap<DeploymentId, Arc<Mutex<()>>>>,
}

impl LogDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The log for one deployment. Cheap; nothing is created until the first
    /// write.
    pub fn for_deployment(&self, id: &DeploymentId) -> DeploymentLog {
        let lock = self
            .locks
            .lock()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        DeploymentLog {
            path: self.path_for(id),
            lock,
        }
    }

    /// Where the log file for a deployment lives (whether or not it exists yet).
    pub fn path_for(&self, id: &DeploymentId) -> PathBuf {
        self.root.join(format!("deployment-{id}.log"))
    }
}

/// Append-only text log for one deployment.
pub struct DeploymentLog {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl DeploymentLog {
    /// Append a timestamped line, creating the log store on first write.
    pub fn write(&self, line: &str) -> Result<(), LogError> {
        let _guard = self.lock.lock();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(LogError::Write)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(LogError::Write)?;

        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{stamp}] {line}").map_err(LogError::Write)?;
        Ok(())
    }

    /// The accumulated content, or [`NO_ACTIVITY`] if nothing was written yet.
    pub fn read(&self) -> Result<String, LogError> {
        let _guard = self.lock.lock();

        if !self.path.exists() {
            return Ok(NO_ACTIVITY.to_string());
        }
        std::fs::read_to_string(&self.path).map_err(LogError::Read)
    }

    /// The content split into lines, for API responses.
    pub fn lines(&self) -> Result<Vec<String>, LogError> {
        Ok(self
            .read()?
            .lines()
            .map(|line| line.to_string())
            .collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
