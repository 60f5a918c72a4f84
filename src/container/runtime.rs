//! Container runtime boundary

use crate::error::Result;
use crate::prover::ProverId;
use async_trait::async_trait;

/// Operations the supervisor performs against prover containers
///
/// Every call is independent. Reading the log never fails hard: a failed
/// read is reported as `None` so callers treat it as "no data". Lifecycle
/// operations return an error that the caller decides how to escalate.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Fetch the last line of the container's log, if any
    async fn fetch_last_log_line(&self, id: &ProverId) -> Option<String>;

    /// Clear the container's log file
    async fn truncate_log(&self, id: &ProverId) -> Result<()>;

    /// Stop the container
    async fn stop(&self, id: &ProverId) -> Result<()>;

    /// Start the container
    async fn start(&self, id: &ProverId) -> Result<()>;

    /// Restart the container
    async fn restart(&self, id: &ProverId) -> Result<()>;
}
