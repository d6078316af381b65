//! Error types for backup-walker
//!
//! This module defines the error hierarchy for:
//! - Traversal errors (fatal root access, cancellation)
//! - Storage backend errors
//! - Configuration and CLI errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Cancellation is a distinguished outcome, not an I/O failure
//! - Non-fatal traversal problems are logged and skipped, never returned

use crate::backend::Kind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the traversal pipeline.
///
/// Only two things can abort a traversal: a root path that cannot be
/// probed, and the cancellation signal. Everything else is reported
/// out-of-band via logging and skipped.
#[derive(Debug, Error)]
pub enum WalkError {
    /// A top-level path is missing or unreadable
    #[error("cannot access root path '{}': {source}", .path.display())]
    RootAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cancellation signal fired (or every job receiver is gone)
    #[error("traversal cancelled")]
    Cancelled,
}

impl WalkError {
    /// Returns true for the cancellation outcome, which callers usually
    /// handle separately from real errors.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WalkError::Cancelled)
    }
}

/// Storage backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// The named object does not exist
    #[error("{kind}/{name} not found")]
    NotFound { kind: Kind, name: String },

    /// Finalizing would overwrite an existing object
    #[error("{kind}/{name} already exists")]
    AlreadyExists { kind: Kind, name: String },

    /// A ranged read asked for an offset past the end of the object
    #[error("object is {len} bytes, cannot seek to offset {offset}")]
    InvalidRange { offset: u64, len: u64 },

    /// Transport or filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Worker thread errors
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Worker thread could not be started
    #[error("failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },
}

/// Configuration and CLI errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid job queue capacity
    #[error("invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Invalid exclude pattern
    #[error("invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// No root paths given
    #[error("at least one root path is required")]
    NoRoots,
}

/// Result type alias for WalkError
pub type WalkResult<T> = std::result::Result<T, WalkError>;

/// Result type alias for BackendError
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type alias for WorkerError
pub type WorkerResult<T> = std::result::Result<T, WorkerError>;

/// Result type alias for ConfigError
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
