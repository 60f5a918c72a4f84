//! Prover watch loop
//!
//! Each iteration reads the active prover from the roster, asks discovery
//! for the latest id, restarts the prover if its log shows a crash, and
//! otherwise rotates to the latest id when it orders before the active one
//! and the active prover has been syncing for a full confirmation window.

use super::classifier::{LogClass, LogClassifier};
use super::clock::Clock;
use crate::container::ContainerRuntime;
use crate::discovery::Discovery;
use crate::error::Result;
use crate::prover::{IdOrdering, ProverId, ProverRoster};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Default delay between iterations and between sync samples
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default wait after restarting a crashed prover
pub const DEFAULT_CRASH_GRACE: Duration = Duration::from_secs(60);

/// Default number of consecutive syncing samples required to rotate
pub const DEFAULT_SYNC_SAMPLES: u32 = 3;

/// What to do when an iteration fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the watcher on any error
    #[default]
    Exit,
    /// Log runtime and discovery errors and keep polling.
    /// Configuration errors still stop the watcher.
    Continue,
}

/// Timing and decision settings for the watcher
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    pub crash_grace: Duration,
    pub sync_samples: u32,
    pub ordering: IdOrdering,
    pub failure_policy: FailurePolicy,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            crash_grace: DEFAULT_CRASH_GRACE,
            sync_samples: DEFAULT_SYNC_SAMPLES,
            ordering: IdOrdering::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Result of a single watch iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The active prover had crashed and was restarted
    Restarted(ProverId),
    /// The active prover was replaced
    Rotated { from: ProverId, to: ProverId },
    /// Nothing to do
    Unchanged,
}

/// Counters kept for status logging
#[derive(Debug, Clone, Serialize)]
pub struct WatchStats {
    pub started_at: DateTime<Utc>,
    pub ticks: u64,
    pub restarts: u64,
    pub rotations: u64,
    pub last_rotation_at: Option<DateTime<Utc>>,
}

impl Default for WatchStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            ticks: 0,
            restarts: 0,
            rotations: 0,
            last_rotation_at: None,
        }
    }
}

/// Prover watcher
pub struct Watcher {
    /// Rotation state, owned by the watcher alone
    roster: ProverRoster,
    /// Log line classifier
    classifier: LogClassifier,
    /// Timing and policy
    settings: WatchSettings,
    /// Container runtime
    runtime: Arc<dyn ContainerRuntime>,
    /// Latest id source
    discovery: Arc<dyn Discovery>,
    /// Sleep capability
    clock: Arc<dyn Clock>,
    /// Counters
    stats: WatchStats,
}

impl Watcher {
    /// Create a new watcher
    pub fn new(
        roster: ProverRoster,
        classifier: LogClassifier,
        settings: WatchSettings,
        runtime: Arc<dyn ContainerRuntime>,
        discovery: Arc<dyn Discovery>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            roster,
            classifier,
            settings,
            runtime,
            discovery,
            clock,
            stats: WatchStats::default(),
        }
    }

    pub fn roster(&self) -> &ProverRoster {
        &self.roster
    }

    pub fn stats(&self) -> &WatchStats {
        &self.stats
    }

    /// Run the watch loop. Only returns on an error the failure policy
    /// does not absorb.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Watching {} provers, active {}",
            self.roster.len(),
            self.roster.current()?
        );

        loop {
            match self.tick().await {
                // The restart path already waited out its grace period
                Ok(TickOutcome::Restarted(_)) => continue,
                Ok(_) => {}
                Err(e)
                    if self.settings.failure_policy == FailurePolicy::Continue
                        && !e.is_config_error() =>
                {
                    error!("Watch iteration failed: {}", e);
                }
                Err(e) => return Err(e),
            }

            self.clock.sleep(self.settings.poll_interval).await;
        }
    }

    /// Run a single watch iteration
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        self.stats.ticks += 1;

        let current = self.roster.current()?.clone();
        let latest = self.discovery.discover_latest().await?;

        if self.is_crashed(&current).await {
            info!("Prover {} crashed, restarting", current);
            self.runtime.restart(&current).await?;
            self.stats.restarts += 1;
            self.clock.sleep(self.settings.crash_grace).await;
            return Ok(TickOutcome::Restarted(current));
        }

        if !latest.precedes(&current, self.settings.ordering)? {
            debug!(
                "Latest prover {} does not precede active prover {}",
                latest, current
            );
            return Ok(TickOutcome::Unchanged);
        }

        if !self.confirm_sync(&current).await {
            debug!("Prover {} is not confirmed syncing, keeping it", current);
            return Ok(TickOutcome::Unchanged);
        }

        self.rotate(&current, &latest).await?;
        Ok(TickOutcome::Rotated {
            from: current,
            to: latest,
        })
    }

    /// Check the last log line for the crash signature. A missing line
    /// counts as not crashed.
    pub async fn is_crashed(&self, id: &ProverId) -> bool {
        match self.runtime.fetch_last_log_line(id).await {
            Some(line) => self.classifier.classify(&line) == LogClass::Crashed,
            None => false,
        }
    }

    /// Sample the log until every sample in the window reads as syncing.
    ///
    /// Any missing line or non-syncing sample fails the whole window.
    pub async fn confirm_sync(&self, id: &ProverId) -> bool {
        let samples = self.settings.sync_samples;

        for sample in 1..=samples {
            let Some(line) = self.runtime.fetch_last_log_line(id).await else {
                debug!("Sync sample {}/{} for {}: no log line", sample, samples, id);
                return false;
            };

            let class = self.classifier.classify(&line);
            debug!("Sync sample {}/{} for {}: {}", sample, samples, id, class);
            if class != LogClass::Syncing {
                return false;
            }

            self.clock.sleep(self.settings.poll_interval).await;
        }

        true
    }

    /// Replace the active prover with `next`
    async fn rotate(&mut self, current: &ProverId, next: &ProverId) -> Result<()> {
        info!("Rotating prover {} -> {}", current, next);

        self.runtime.stop(current).await?;
        self.runtime.truncate_log(current).await?;

        let advanced = self.roster.advance()?.clone();
        if !self.roster.contains(next) {
            debug!("Prover {} is not in the roster (cursor now at {})", next, advanced);
        }

        self.runtime.start(next).await?;

        self.stats.rotations += 1;
        self.stats.last_rotation_at = Some(Utc::now());
        info!(
            "Rotated to prover {} ({} rotations since {})",
            next, self.stats.rotations, self.stats.started_at
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const CRASH_LINE: &str = "rax 0x0 gs     0x0 fs 0x0";
    const SYNC_LINE: &str = "Syncing block 1204/5000";

    /// Runtime that replays scripted log lines and records lifecycle calls
    #[derive(Default)]
    struct FakeRuntime {
        lines: Mutex<VecDeque<Option<String>>>,
        calls: Mutex<Vec<String>>,
        fail_op: Option<&'static str>,
    }

    impl FakeRuntime {
        fn with_lines(lines: &[Option<&str>]) -> Self {
            Self {
                lines: Mutex::new(lines.iter().map(|l| l.map(str::to_string)).collect()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn remaining_lines(&self) -> usize {
            self.lines.lock().unwrap().len()
        }

        fn record(&self, op: &'static str, id: &ProverId) -> Result<()> {
            self.calls.lock().unwrap().push(format!("{} {}", op, id));
            if self.fail_op == Some(op) {
                return Err(WatchError::Runtime {
                    op,
                    id: id.to_string(),
                    message: "scripted failure".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn fetch_last_log_line(&self, _id: &ProverId) -> Option<String> {
            self.lines.lock().unwrap().pop_front().flatten()
        }

        async fn truncate_log(&self, id: &ProverId) -> Result<()> {
            self.record("truncate", id)
        }

        async fn stop(&self, id: &ProverId) -> Result<()> {
            self.record("stop", id)
        }

        async fn start(&self, id: &ProverId) -> Result<()> {
            self.record("start", id)
        }

        async fn restart(&self, id: &ProverId) -> Result<()> {
            self.record("restart", id)
        }
    }

    /// Discovery that replays scripted answers, then fails
    struct ScriptedDiscovery {
        answers: Mutex<VecDeque<Result<ProverId>>>,
    }

    impl ScriptedDiscovery {
        fn new(answers: Vec<Result<ProverId>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
            }
        }

        fn always(id: &str, times: usize) -> Self {
            Self::new((0..times).map(|_| Ok(ProverId::from(id))).collect())
        }
    }

    #[async_trait]
    impl Discovery for ScriptedDiscovery {
        async fn discover_latest(&self) -> Result<ProverId> {
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(WatchError::Discovery("script exhausted".to_string())))
        }
    }

    /// Clock that returns immediately and records requested sleeps
    #[derive(Default)]
    struct RecordingClock {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingClock {
        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for RecordingClock {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    struct Harness {
        watcher: Watcher,
        runtime: Arc<FakeRuntime>,
        clock: Arc<RecordingClock>,
    }

    fn harness(
        roster: &[&str],
        settings: WatchSettings,
        runtime: FakeRuntime,
        discovery: ScriptedDiscovery,
    ) -> Harness {
        let roster =
            ProverRoster::new(roster.iter().map(|s| ProverId::from(*s)).collect()).unwrap();
        let runtime = Arc::new(runtime);
        let clock = Arc::new(RecordingClock::default());

        let watcher = Watcher::new(
            roster,
            LogClassifier::default(),
            settings,
            runtime.clone(),
            Arc::new(discovery),
            clock.clone(),
        );

        Harness {
            watcher,
            runtime,
            clock,
        }
    }

    fn minute() -> Duration {
        Duration::from_secs(60)
    }

    #[tokio::test]
    async fn test_confirm_sync_requires_full_window() {
        let cases: [(&[Option<&str>], bool, usize); 4] = [
            (&[Some(SYNC_LINE), Some(SYNC_LINE), Some("proof done")], false, 2),
            (&[Some(SYNC_LINE), Some(SYNC_LINE), Some(SYNC_LINE)], true, 3),
            (&[Some(SYNC_LINE), None, Some(SYNC_LINE)], false, 1),
            (&[Some(CRASH_LINE), Some(SYNC_LINE), Some(SYNC_LINE)], false, 0),
        ];

        for (lines, expected, sleeps) in cases {
            let h = harness(
                &["7"],
                WatchSettings::default(),
                FakeRuntime::with_lines(lines),
                ScriptedDiscovery::new(Vec::new()),
            );

            let synced = h.watcher.confirm_sync(&ProverId::from("7")).await;
            assert_eq!(synced, expected, "lines: {:?}", lines);
            assert_eq!(h.clock.sleeps(), vec![minute(); sleeps]);
        }
    }

    #[tokio::test]
    async fn test_rotates_when_latest_precedes_and_synced() {
        let mut h = harness(
            &["7", "9"],
            WatchSettings::default(),
            FakeRuntime::with_lines(&[Some(SYNC_LINE); 4]),
            ScriptedDiscovery::always("5", 1),
        );

        let outcome = h.watcher.tick().await.unwrap();

        assert_eq!(
            outcome,
            TickOutcome::Rotated {
                from: ProverId::from("7"),
                to: ProverId::from("5"),
            }
        );
        assert_eq!(h.runtime.calls(), vec!["stop 7", "truncate 7", "start 5"]);
        assert_eq!(h.watcher.roster().cursor(), 1);
        assert_eq!(h.clock.sleeps(), vec![minute(); 3]);
        assert_eq!(h.watcher.stats().rotations, 1);
        assert!(h.watcher.stats().last_rotation_at.is_some());
    }

    #[tokio::test]
    async fn test_no_rotation_when_latest_is_newer() {
        let mut h = harness(
            &["7", "9"],
            WatchSettings::default(),
            FakeRuntime::with_lines(&[Some(SYNC_LINE); 4]),
            ScriptedDiscovery::always("9", 1),
        );

        let outcome = h.watcher.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::Unchanged);
        assert!(h.runtime.calls().is_empty());
        assert_eq!(h.watcher.roster().cursor(), 0);
        // Only the crash check read the log; no sync window was sampled
        assert_eq!(h.runtime.remaining_lines(), 3);
        assert!(h.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_no_rotation_when_not_synced() {
        let mut h = harness(
            &["7", "9"],
            WatchSettings::default(),
            FakeRuntime::with_lines(&[
                Some(SYNC_LINE),
                Some(SYNC_LINE),
                Some(SYNC_LINE),
                Some("generating proof"),
            ]),
            ScriptedDiscovery::always("5", 1),
        );

        let outcome = h.watcher.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::Unchanged);
        assert!(h.runtime.calls().is_empty());
        assert_eq!(h.watcher.roster().cursor(), 0);
    }

    #[tokio::test]
    async fn test_crash_short_circuits_rotation() {
        let mut h = harness(
            &["7", "9"],
            WatchSettings::default(),
            FakeRuntime::with_lines(&[
                Some(CRASH_LINE),
                Some(SYNC_LINE),
                Some(SYNC_LINE),
                Some(SYNC_LINE),
            ]),
            ScriptedDiscovery::always("5", 1),
        );

        let outcome = h.watcher.tick().await.unwrap();

        assert_eq!(outcome, TickOutcome::Restarted(ProverId::from("7")));
        assert_eq!(h.runtime.calls(), vec!["restart 7"]);
        assert_eq!(h.runtime.remaining_lines(), 3);
        assert_eq!(h.clock.sleeps(), vec![minute()]);
        assert_eq!(h.watcher.roster().cursor(), 0);
        assert_eq!(h.watcher.stats().restarts, 1);
    }

    #[tokio::test]
    async fn test_missing_log_is_not_a_crash() {
        let mut h = harness(
            &["7"],
            WatchSettings::default(),
            FakeRuntime::with_lines(&[None]),
            ScriptedDiscovery::always("7", 1),
        );

        assert_eq!(h.watcher.tick().await.unwrap(), TickOutcome::Unchanged);
        assert!(h.runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_same_latest_leaves_state_unchanged() {
        let settings = WatchSettings {
            ordering: IdOrdering::Lexical,
            ..WatchSettings::default()
        };
        let mut h = harness(
            &["A", "B", "C"],
            settings,
            FakeRuntime::with_lines(&[Some(SYNC_LINE); 3]),
            ScriptedDiscovery::always("A", 3),
        );

        for _ in 0..3 {
            assert_eq!(h.watcher.tick().await.unwrap(), TickOutcome::Unchanged);
        }

        assert_eq!(h.watcher.roster().current().unwrap().as_str(), "A");
        assert!(h.runtime.calls().is_empty());
        assert_eq!(h.watcher.stats().ticks, 3);
    }

    #[tokio::test]
    async fn test_restart_failure_is_fatal() {
        let runtime = FakeRuntime {
            fail_op: Some("restart"),
            ..FakeRuntime::with_lines(&[Some(CRASH_LINE)])
        };
        let mut h = harness(
            &["7"],
            WatchSettings::default(),
            runtime,
            ScriptedDiscovery::always("7", 1),
        );

        let result = h.watcher.tick().await;
        assert!(matches!(result, Err(WatchError::Runtime { op: "restart", .. })));
        assert!(h.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_failed_stop_aborts_rotation() {
        let runtime = FakeRuntime {
            fail_op: Some("stop"),
            ..FakeRuntime::with_lines(&[Some(SYNC_LINE); 4])
        };
        let mut h = harness(
            &["7", "9"],
            WatchSettings::default(),
            runtime,
            ScriptedDiscovery::always("5", 1),
        );

        assert!(h.watcher.tick().await.is_err());
        assert_eq!(h.runtime.calls(), vec!["stop 7"]);
        assert_eq!(h.watcher.roster().cursor(), 0);
    }

    #[tokio::test]
    async fn test_run_exits_on_discovery_failure() {
        let mut h = harness(
            &["7"],
            WatchSettings::default(),
            FakeRuntime::default(),
            ScriptedDiscovery::always("7", 2),
        );

        let result = h.watcher.run().await;

        assert!(matches!(result, Err(WatchError::Discovery(_))));
        assert_eq!(h.watcher.stats().ticks, 3);
        assert_eq!(h.clock.sleeps(), vec![minute(); 2]);
    }

    #[tokio::test]
    async fn test_run_does_not_double_sleep_after_restart() {
        let mut h = harness(
            &["7"],
            WatchSettings {
                crash_grace: Duration::from_secs(30),
                ..WatchSettings::default()
            },
            FakeRuntime::with_lines(&[Some(CRASH_LINE)]),
            ScriptedDiscovery::always("7", 1),
        );

        assert!(h.watcher.run().await.is_err());
        assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(30)]);
    }

    #[tokio::test]
    async fn test_continue_policy_absorbs_boundary_errors() {
        let settings = WatchSettings {
            failure_policy: FailurePolicy::Continue,
            ..WatchSettings::default()
        };
        let mut h = harness(
            &["7"],
            settings,
            FakeRuntime::default(),
            ScriptedDiscovery::new(vec![
                Err(WatchError::Discovery("timeout".to_string())),
                Ok(ProverId::from("7")),
                // Not numeric: a configuration error, which always stops
                Ok(ProverId::from("latest")),
            ]),
        );

        let result = h.watcher.run().await;

        assert!(matches!(result, Err(WatchError::InvalidId { .. })));
        assert_eq!(h.watcher.stats().ticks, 3);
        assert_eq!(h.clock.sleeps(), vec![minute(); 2]);
    }

    #[tokio::test]
    async fn test_custom_sample_count() {
        let settings = WatchSettings {
            sync_samples: 5,
            poll_interval: Duration::from_secs(10),
            ..WatchSettings::default()
        };
        let h = harness(
            &["7"],
            settings,
            FakeRuntime::with_lines(&[Some(SYNC_LINE); 5]),
            ScriptedDiscovery::new(Vec::new()),
        );

        assert!(h.watcher.confirm_sync(&ProverId::from("7")).await);
        assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(10); 5]);
    }
}
