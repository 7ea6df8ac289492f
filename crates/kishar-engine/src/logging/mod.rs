//! Logging utilities.
//!
//! Centralizes logger initialization. Engine code logs through the standard
//! `log` facade; nothing here imposes a backend on library consumers beyond
//! the optional `init_logging` convenience.

mod init;

pub use init::{LoggingConfig, WriteStyle, init_logging};
