//! HTTP discovery of the latest prover id

use super::{Discovery, DiscoveryConfig, DiscoveryFormat};
use crate::error::{Result, WatchError};
use crate::prover::ProverId;
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::debug;

/// Discovers the latest prover id from a web endpoint
pub struct HttpDiscovery {
    /// Endpoint URL
    url: String,
    /// How to read the id out of the response body
    extractor: Extractor,
    /// HTTP client
    client: reqwest::Client,
}

/// Compiled form of a [`DiscoveryFormat`]
#[derive(Debug, Clone)]
enum Extractor {
    Text,
    Json(String),
    Regex(Regex),
}

impl HttpDiscovery {
    /// Create a new HTTP discovery client from configuration
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let url = config.url.clone().ok_or_else(|| {
            WatchError::InvalidConfig("HTTP discovery requires a url".to_string())
        })?;

        let extractor = match config.format {
            DiscoveryFormat::Text => Extractor::Text,
            DiscoveryFormat::Json => {
                let pointer = config.json_pointer.clone().ok_or_else(|| {
                    WatchError::InvalidConfig("JSON discovery requires json_pointer".to_string())
                })?;
                Extractor::Json(pointer)
            }
            DiscoveryFormat::Regex => {
                let pattern = config.pattern.as_deref().ok_or_else(|| {
                    WatchError::InvalidConfig("Regex discovery requires a pattern".to_string())
                })?;
                let regex = Regex::new(pattern).map_err(|e| {
                    WatchError::InvalidConfig(format!("Invalid discovery pattern: {}", e))
                })?;
                Extractor::Regex(regex)
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WatchError::Network(e.to_string()))?;

        Ok(Self {
            url,
            extractor,
            client,
        })
    }

    /// Pull the prover id out of a response body
    fn extract(&self, body: &str) -> Result<ProverId> {
        let raw = match &self.extractor {
            Extractor::Text => body.trim().to_string(),
            Extractor::Json(pointer) => {
                let value: serde_json::Value = serde_json::from_str(body)?;
                match value.pointer(pointer) {
                    Some(serde_json::Value::String(s)) => s.trim().to_string(),
                    Some(serde_json::Value::Number(n)) => n.to_string(),
                    Some(other) => {
                        return Err(WatchError::Discovery(format!(
                            "Value at {} is not a string or number: {}",
                            pointer, other
                        )))
                    }
                    None => {
                        return Err(WatchError::Discovery(format!(
                            "No value at {} in discovery response",
                            pointer
                        )))
                    }
                }
            }
            Extractor::Regex(regex) => {
                let captures = regex.captures(body).ok_or_else(|| {
                    WatchError::Discovery(format!(
                        "Pattern {} did not match discovery response",
                        regex.as_str()
                    ))
                })?;
                captures
                    .get(1)
                    .or_else(|| captures.get(0))
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default()
            }
        };

        if raw.is_empty() {
            return Err(WatchError::Discovery(
                "Discovery response contained an empty id".to_string(),
            ));
        }

        Ok(ProverId::new(raw))
    }
}

#[async_trait]
impl Discovery for HttpDiscovery {
    async fn discover_latest(&self) -> Result<ProverId> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| WatchError::Discovery(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(WatchError::Discovery(format!(
                "Request to {} returned {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WatchError::Network(e.to_string()))?;

        let id = self.extract(&body)?;
        debug!("Discovered latest prover id {}", id);
        Ok(id)
    }
}
