//! Core logic for Stormwatch.
//!
//! This crate holds everything that is neither I/O nor transport:
//! - [`scanner`]: extraction of thunderstorm danger windows from a forecast
//! - [`config`]: environment and file configuration, directory layout

pub mod config;
pub mod error;
pub mod scanner;

pub use config::{AlertSettings, StormwatchConfig};
pub use error::{ConfigError, Result};
pub use scanner::{reference_now, ThunderScanner, DEFAULT_THUNDERSTORM_CODES};
