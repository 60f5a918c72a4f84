//! Log line classification

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};

/// Register dump fragment the prover prints when it faults
pub const DEFAULT_CRASH_MARKER: &str = "gs     0x0";

/// Marker of a prover that is syncing, matched case-insensitively
pub const DEFAULT_SYNC_MARKER: &str = "sync";

/// What a log line says about the prover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogClass {
    /// The prover hit a fatal fault
    Crashed,
    /// The prover is syncing
    Syncing,
    /// Anything else
    Normal,
}

impl std::fmt::Display for LogClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogClass::Crashed => write!(f, "crashed"),
            LogClass::Syncing => write!(f, "syncing"),
            LogClass::Normal => write!(f, "normal"),
        }
    }
}

/// Substring classifier for prover log lines
#[derive(Debug, Clone)]
pub struct LogClassifier {
    /// Case-sensitive crash signature
    crash_marker: String,
    /// Sync marker, stored lowercase
    sync_marker: String,
}

impl Default for LogClassifier {
    fn default() -> Self {
        Self {
            crash_marker: DEFAULT_CRASH_MARKER.to_string(),
            sync_marker: DEFAULT_SYNC_MARKER.to_string(),
        }
    }
}

impl LogClassifier {
    /// Create a classifier with custom markers
    pub fn new(crash_marker: &str, sync_marker: &str) -> Result<Self> {
        if crash_marker.is_empty() {
            return Err(WatchError::InvalidConfig(
                "Crash marker must not be empty".to_string(),
            ));
        }
        if sync_marker.is_empty() {
            return Err(WatchError::InvalidConfig(
                "Sync marker must not be empty".to_string(),
            ));
        }

        Ok(Self {
            crash_marker: crash_marker.to_string(),
            sync_marker: sync_marker.to_lowercase(),
        })
    }

    /// Classify a single line. The crash marker wins over the sync marker.
    pub fn classify(&self, line: &str) -> LogClass {
        if line.contains(&self.crash_marker) {
            LogClass::Crashed
        } else if line.to_lowercase().contains(&self.sync_marker) {
            LogClass::Syncing
        } else {
            LogClass::Normal
        }
    }
}
