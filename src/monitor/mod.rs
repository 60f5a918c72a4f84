//! Prover monitoring module
//!
//! This module provides the watch loop that detects crashed provers from
//! their log tails, confirms sync state, and rotates the active prover.

pub mod classifier;
pub mod clock;
pub mod watcher;

pub use classifier::{LogClass, LogClassifier};
pub use clock::{Clock, TokioClock};
pub use watcher::{FailurePolicy, TickOutcome, WatchSettings, WatchStats, Watcher};
