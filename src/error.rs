//! Error types for colloquy operations.

use thiserror::Error;

/// Errors that can occur while compiling a timestamp grammar or page
/// configuration. Parsing itself never fails; see [`crate::Warning`] for
/// recoverable per-comment conditions.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid timestamp format: {0}")]
    BadFormat(String),

    #[error("timestamp pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
