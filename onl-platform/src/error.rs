//! Common error types for onl-platform.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for platform bring-up operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors from tokio or std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required external tool exited unsuccessfully
    #[error("`{program}` exited with status {status}: {stderr}")]
    Command {
        program: String,
        status: i32,
        stderr: String,
    },

    /// A kernel module file could not be located
    #[error("kernel module {module} could not be found (searched {searched:?})")]
    ModuleNotFound {
        module: String,
        searched: Vec<PathBuf>,
    },

    /// Tool output that could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// No registered platform matches the identifier
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    /// The BMC never exposed a usable IPMI interface
    #[error("IPMI interface did not become ready")]
    IpmiUnavailable,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
