//! Prover identifiers and their ordering

use crate::error::{Result, WatchError};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;

/// Opaque identifier of a prover container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProverId(String);

// Config files commonly list ids as bare integers
impl<'de> Deserialize<'de> for ProverId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => ProverId(s),
            Raw::Number(n) => ProverId(n.to_string()),
        })
    }
}

impl ProverId {
    /// Create a new prover id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as passed to the container runtime
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this id orders strictly before `other`
    pub fn precedes(&self, other: &ProverId, ordering: IdOrdering) -> Result<bool> {
        Ok(ordering.compare(self, other)? == Ordering::Less)
    }
}

impl std::fmt::Display for ProverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProverId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProverId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How two prover ids are ordered when deciding on a rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdOrdering {
    /// Plain byte-wise string order
    Lexical,
    /// Both ids parsed as unsigned integers
    #[default]
    Numeric,
    /// Dot or dash separated segments, numeric where both segments are numeric
    Version,
}

impl IdOrdering {
    /// Compare two ids under this ordering
    pub fn compare(self, a: &ProverId, b: &ProverId) -> Result<Ordering> {
        match self {
            IdOrdering::Lexical => Ok(a.as_str().cmp(b.as_str())),
            IdOrdering::Numeric => Ok(parse_numeric(a)?.cmp(&parse_numeric(b)?)),
            IdOrdering::Version => Ok(compare_versions(a.as_str(), b.as_str())),
        }
    }

    /// Check that an id can take part in comparisons under this ordering
    pub fn validate(self, id: &ProverId) -> Result<()> {
        match self {
            IdOrdering::Numeric => parse_numeric(id).map(|_| ()),
            IdOrdering::Lexical | IdOrdering::Version => Ok(()),
        }
    }
}

impl std::fmt::Display for IdOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdOrdering::Lexical => write!(f, "lexical"),
            IdOrdering::Numeric => write!(f, "numeric"),
            IdOrdering::Version => write!(f, "version"),
        }
    }
}

impl std::str::FromStr for IdOrdering {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" => Ok(IdOrdering::Lexical),
            "numeric" => Ok(IdOrdering::Numeric),
            "version" => Ok(IdOrdering::Version),
            other => Err(WatchError::InvalidConfig(format!(
                "Unknown id ordering: {}",
                other
            ))),
        }
    }
}

fn parse_numeric(id: &ProverId) -> Result<u128> {
    id.as_str()
        .trim()
        .parse::<u128>()
        .map_err(|e| WatchError::InvalidId {
            id: id.to_string(),
            reason: format!("not an unsigned integer ({})", e),
        })
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-']);
    let mut right = b.split(['.', '-']);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
