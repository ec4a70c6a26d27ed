//! Logging utilities.
//!
//! Registry and backend code log through the `log` facade; this module only
//! installs the `env_logger` backend for binaries that want one.

mod init;

pub use init::{init_logging, LoggingConfig};
