//! Prover identity and rotation state
//!
//! A roster is the fixed list of prover containers eligible for rotation,
//! with a cursor pointing at the one currently running.

pub mod id;
pub mod roster;

pub use id::{IdOrdering, ProverId};
pub use roster::ProverRoster;
