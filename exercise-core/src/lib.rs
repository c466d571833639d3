pub mod aim;
pub mod catalog;
pub mod config;
pub mod display;
pub mod error;
pub mod evaluation;
pub mod pipeline;
pub mod pose;
pub mod runtime;
pub mod source;
pub mod tracking;

// Edge I/O (config files, pose streams, actuators) reports through anyhow;
// configuration validation has its own error type.
pub use anyhow::Error;
pub use anyhow::Result;
pub use error::ConfigError;
