// ABOUTME: Service configuration types and parsing for stagehand.yml.
// ABOUTME: Log directory, re-plan conflict policy, and the API security token.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONFIG_FILENAME: &str = "stagehand.yml";
pub const CONFIG_FILENAME_ALT: &str = "stagehand.yaml";

/// What to do when the re-plan before queueing resolves a different target
/// than the one submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplanPolicy {
    /// Adopt the refreshed plan and queue it.
    #[default]
    LatestWins,
    /// Refuse to queue; the caller must submit a new deployment.
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the per-deployment log files.
    pub log_dir: PathBuf,

    /// Anti-forgery token required on every mutating API request.
    pub security_token: String,

    #[serde(default)]
    pub replan: ReplanPolicy,
}

impl Config {
    /// Load configuration from a directory, trying the known filenames.
    pub fn discover(dir: &Path) -> Result<Self> {
        for name in [CONFIG_FILENAME, CONFIG_FILENAME_ALT] {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }
        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// A starting-point config, used by `stagehand init` and tests.
    pub fn template() -> Self {
        Self {
            log_dir: PathBuf::from("deploy-logs"),
            security_token: "change-me".to_string(),
            replan: ReplanPolicy::default(),
        }
    }
}

/// Write a template configuration file into `dir`.
///
/// # Errors
///
/// Returns `AlreadyExists` unless `force` is set and the file is replaced.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILENAME);
    if path.exists() && !force {
        return Err(Error::AlreadyExists(path));
    }
    std::fs::write(&path, TEMPLATE)?;
    Ok(path)
}

const TEMPLATE: &str = "\
# stagehand configuration
log_dir: deploy-logs
security_token: change-me
# What to do when the pre-queue re-plan resolves a different target:
#   latest-wins (default) or reject
replan: latest-wins
";
