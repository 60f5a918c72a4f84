//! Supervisor configuration

pub mod parser;
pub mod settings;

pub use parser::ConfigParser;
pub use settings::WatchConfig;
