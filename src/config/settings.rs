//! Supervisor configuration

use crate::container::RuntimeConfig;
use crate::discovery::DiscoveryConfig;
use crate::error::Result;
use crate::monitor::classifier::{DEFAULT_CRASH_MARKER, DEFAULT_SYNC_MARKER};
use crate::monitor::watcher::{DEFAULT_CRASH_GRACE, DEFAULT_POLL_INTERVAL, DEFAULT_SYNC_SAMPLES};
use crate::monitor::{FailurePolicy, LogClassifier, WatchSettings};
use crate::prover::{IdOrdering, ProverId, ProverRoster};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level supervisor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Prover ids eligible for rotation, in rotation order
    pub roster: Vec<ProverId>,
    /// Roster index of the prover running at startup
    pub initial_index: usize,
    /// How prover ids are ordered
    pub id_ordering: IdOrdering,
    /// Seconds between iterations and between sync samples
    pub poll_interval_secs: u64,
    /// Seconds to wait after restarting a crashed prover
    pub crash_grace_secs: u64,
    /// Consecutive syncing samples required before rotating
    pub sync_samples: u32,
    /// Case-sensitive crash signature
    pub crash_marker: String,
    /// Case-insensitive sync marker
    pub sync_marker: String,
    /// What to do when an iteration fails
    pub failure_policy: FailurePolicy,
    /// Container runtime settings
    pub runtime: RuntimeConfig,
    /// Latest id discovery settings
    pub discovery: DiscoveryConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            roster: Vec::new(),
            initial_index: 0,
            id_ordering: IdOrdering::default(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            crash_grace_secs: DEFAULT_CRASH_GRACE.as_secs(),
            sync_samples: DEFAULT_SYNC_SAMPLES,
            crash_marker: DEFAULT_CRASH_MARKER.to_string(),
            sync_marker: DEFAULT_SYNC_MARKER.to_string(),
            failure_policy: FailurePolicy::default(),
            runtime: RuntimeConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl WatchConfig {
    /// Build the rotation state
    pub fn build_roster(&self) -> Result<ProverRoster> {
        ProverRoster::with_cursor(self.roster.clone(), self.initial_index)
    }

    /// Build the log classifier
    pub fn build_classifier(&self) -> Result<LogClassifier> {
        LogClassifier::new(&self.crash_marker, &self.sync_marker)
    }

    /// Timing and policy for the watcher
    pub fn watch_settings(&self) -> WatchSettings {
        WatchSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            crash_grace: Duration::from_secs(self.crash_grace_secs),
            sync_samples: self.sync_samples,
            ordering: self.id_ordering,
            failure_policy: self.failure_policy,
        }
    }
}
