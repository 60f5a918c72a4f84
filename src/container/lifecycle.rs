//! Docker CLI backed container runtime

use super::config::RuntimeConfig;
use super::runtime::ContainerRuntime;
use crate::error::{Result, WatchError};
use crate::prover::ProverId;
use async_trait::async_trait;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, warn};

/// Container runtime that shells out to the docker CLI
///
/// Arguments are passed as argv, never through a shell, so container ids
/// and log paths are not subject to word splitting.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    config: RuntimeConfig,
}

impl DockerRuntime {
    /// Create a new docker runtime
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    async fn exec(&self, args: &[&str]) -> std::io::Result<Output> {
        debug!("{} {}", self.config.docker_bin.display(), args.join(" "));

        Command::new(&self.config.docker_bin)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
    }

    /// Run a lifecycle command, mapping any failure to a runtime error
    async fn lifecycle(&self, op: &'static str, args: &[&str], id: &ProverId) -> Result<()> {
        let output = self.exec(args).await.map_err(|e| WatchError::Runtime {
            op,
            id: id.to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(WatchError::Runtime {
                op,
                id: id.to_string(),
                message: failure_message(&output),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn fetch_last_log_line(&self, id: &ProverId) -> Option<String> {
        let args = [
            "exec",
            id.as_str(),
            "tail",
            "-n",
            "1",
            self.config.log_path.as_str(),
        ];

        let output = match self.exec(&args).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run log tail for {}: {}", id, e);
                return None;
            }
        };

        if !output.status.success() {
            warn!("Failed to fetch log for {}: {}", id, failure_message(&output));
            return None;
        }

        let line = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if line.is_empty() {
            debug!("Log for {} is empty", id);
            return None;
        }

        Some(line)
    }

    async fn truncate_log(&self, id: &ProverId) -> Result<()> {
        let args = [
            "exec",
            id.as_str(),
            "truncate",
            "-s",
            "0",
            self.config.log_path.as_str(),
        ];
        self.lifecycle("truncate", &args, id).await
    }

    async fn stop(&self, id: &ProverId) -> Result<()> {
        self.lifecycle("stop", &["stop", id.as_str()], id).await
    }

    async fn start(&self, id: &ProverId) -> Result<()> {
        self.lifecycle("start", &["start", id.as_str()], id).await
    }

    async fn restart(&self, id: &ProverId) -> Result<()> {
        self.lifecycle("restart", &["restart", id.as_str()], id).await
    }
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        output.status.to_string()
    } else {
        stderr
    }
}
