//! Logging setup.
//!
//! Everything in this crate logs through the `log` facade; this module only
//! installs the `env_logger` backend for binaries.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
