//! Container runtime configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default container runtime binary
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// Default path of the prover log inside the container
pub const DEFAULT_LOG_PATH: &str = "/app/runtime.log";

/// How to reach the container runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Runtime CLI binary (`docker`, `podman`, or an absolute path)
    pub docker_bin: PathBuf,
    /// Log file inside each prover container
    pub log_path: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_bin: PathBuf::from(DEFAULT_DOCKER_BIN),
            log_path: DEFAULT_LOG_PATH.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Create a configuration for the given runtime binary
    pub fn new(docker_bin: impl Into<PathBuf>) -> Self {
        Self {
            docker_bin: docker_bin.into(),
            ..Self::default()
        }
    }

    /// Set the log path inside the container
    pub fn log_path(mut self, path: &str) -> Self {
        self.log_path = path.to_string();
        self
    }
}
