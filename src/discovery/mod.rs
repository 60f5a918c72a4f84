//! Latest prover id discovery
//!
//! The supervisor asks a discovery source for the newest prover id on every
//! iteration. The id is compared against the active prover to decide
//! whether a rotation is due.

pub mod http;

pub use http::HttpDiscovery;

use crate::error::{Result, WatchError};
use crate::prover::ProverId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default request timeout for HTTP discovery
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of the latest prover id
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Discover the latest prover id
    async fn discover_latest(&self) -> Result<ProverId>;
}

/// How an HTTP discovery response is read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryFormat {
    /// The trimmed body is the id
    #[default]
    Text,
    /// The id is found at a JSON pointer
    Json,
    /// The id is the first capture group of a pattern
    Regex,
}

/// Discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Endpoint returning the latest prover id
    pub url: Option<String>,
    /// Response format
    pub format: DiscoveryFormat,
    /// JSON pointer, for the json format
    pub json_pointer: Option<String>,
    /// Pattern, for the regex format
    pub pattern: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Pin discovery to a fixed id instead of querying an endpoint
    pub static_id: Option<ProverId>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            url: None,
            format: DiscoveryFormat::Text,
            json_pointer: None,
            pattern: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            static_id: None,
        }
    }
}

/// Discovery that always returns the same id
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    id: ProverId,
}

impl StaticDiscovery {
    pub fn new(id: impl Into<ProverId>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover_latest(&self) -> Result<ProverId> {
        Ok(self.id.clone())
    }
}

/// Build the discovery source described by the configuration
///
/// A static id takes precedence over a URL.
pub fn from_config(config: &DiscoveryConfig) -> Result<Arc<dyn Discovery>> {
    if let Some(id) = &config.static_id {
        return Ok(Arc::new(StaticDiscovery::new(id.clone())));
    }

    if config.url.is_some() {
        return Ok(Arc::new(HttpDiscovery::new(config)?));
    }

    Err(WatchError::InvalidConfig(
        "Discovery requires either a url or a static_id".to_string(),
    ))
}
