//! Error types for the directory state manager
//!
//! Directory-protocol rejections (stale consensus, unknown descriptor,
//! duplicate nickname, ...) are absorbed and logged; they never show up
//! here. This taxonomy only covers what callers must handle:
//! - Contract violations (batch name lookup)
//! - Malformed caller input
//! - Bounded waits that ran out
//! - State file and configuration problems

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Lookup errors (1xx)
    RouterNotFound = 100,
    InvalidIdentity = 101,

    // Bootstrap errors (2xx)
    BootstrapTimeout = 200,

    // Storage errors (7xx)
    StateFileError = 700,

    // Configuration errors (8xx)
    ConfigError = 800,
}

/// Main error type for the directory
#[derive(Error, Debug, Clone)]
pub enum DirectoryError {
    // ===== Lookup Errors =====
    #[error("Could not find router named: {0}")]
    RouterNotFound(String),

    #[error("Invalid identity fingerprint: {0}")]
    InvalidIdentity(String),

    // ===== Bootstrap Errors =====
    #[error("Directory not loaded after {0:?}")]
    BootstrapTimeout(Duration),

    // ===== Storage Errors =====
    #[error("State file error: {0}")]
    StateFile(String),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DirectoryError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            DirectoryError::RouterNotFound(_) => ErrorCode::RouterNotFound,
            DirectoryError::InvalidIdentity(_) => ErrorCode::InvalidIdentity,
            DirectoryError::BootstrapTimeout(_) => ErrorCode::BootstrapTimeout,
            DirectoryError::StateFile(_) => ErrorCode::StateFileError,
            DirectoryError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// Whether retrying the same call later can succeed
    ///
    /// A bootstrap timeout only means the cached state is still loading.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DirectoryError::BootstrapTimeout(_))
    }

    /// Whether this error requires a change on the caller's side
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            DirectoryError::RouterNotFound(_)
                | DirectoryError::InvalidIdentity(_)
                | DirectoryError::Config(_)
        )
    }
}
