//! Container runtime module
//!
//! This module is the boundary between the supervisor and the container
//! runtime: reading and truncating prover logs, and stopping, starting or
//! restarting prover containers.

pub mod config;
pub mod lifecycle;
pub mod runtime;

pub use config::RuntimeConfig;
pub use lifecycle::DockerRuntime;
pub use runtime::ContainerRuntime;
