//! Prover roster with the active cursor

use super::id::ProverId;
use crate::error::{Result, WatchError};

/// Fixed, ordered set of provers eligible for rotation
#[derive(Debug, Clone)]
pub struct ProverRoster {
    /// Candidate prover ids
    ids: Vec<ProverId>,
    /// Index of the active prover
    cursor: usize,
}

impl ProverRoster {
    /// Create a roster with the first entry active
    pub fn new(ids: Vec<ProverId>) -> Result<Self> {
        Self::with_cursor(ids, 0)
    }

    /// Create a roster with the entry at `cursor` active
    pub fn with_cursor(ids: Vec<ProverId>, cursor: usize) -> Result<Self> {
        if ids.is_empty() {
            return Err(WatchError::EmptyRoster);
        }
        if cursor >= ids.len() {
            return Err(WatchError::InvalidConfig(format!(
                "Initial index {} is out of range for a roster of {}",
                cursor,
                ids.len()
            )));
        }

        Ok(Self { ids, cursor })
    }

    /// Get the active prover
    pub fn current(&self) -> Result<&ProverId> {
        self.ids.get(self.cursor).ok_or(WatchError::EmptyRoster)
    }

    /// Move to the next prover, wrapping around, and return it
    pub fn advance(&mut self) -> Result<&ProverId> {
        if self.ids.is_empty() {
            return Err(WatchError::EmptyRoster);
        }
        self.cursor = (self.cursor + 1) % self.ids.len();
        self.current()
    }

    /// Index of the active prover
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of provers in the roster
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the roster has no provers
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Check if a prover id is part of the roster
    pub fn contains(&self, id: &ProverId) -> bool {
        self.ids.contains(id)
    }
}
