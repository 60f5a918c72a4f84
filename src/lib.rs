//! prover-watch - A supervisor for rotating prover containers
//!
//! prover-watch keeps one prover container from a fixed roster running.
//! It provides:
//!
//! - Crash detection from the prover's last log line, with automatic restart
//! - Sync confirmation over several spaced log samples
//! - Rotation to a newer prover id found through an HTTP discovery endpoint
//! - A docker CLI backed container runtime adapter

pub mod config;
pub mod container;
pub mod discovery;
pub mod error;
pub mod monitor;
pub mod prover;

pub use error::{Result, WatchError};
