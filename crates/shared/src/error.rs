//! Error types for Gridlock

use thiserror::Error;

/// General Gridlock error type
#[derive(Debug, Error)]
pub enum GridlockError {
    /// A shared-memory segment could not be created, attached, or mapped.
    ///
    /// Fatal to the calling process: nothing downstream can proceed without
    /// the segment, so there is no retry path.
    #[error("shared memory '{name}': {op} failed: {source}")]
    Shm {
        name: String,
        op: &'static str,
        source: std::io::Error,
    },

    /// A process-shared semaphore operation failed.
    #[error("semaphore {op} failed: {source}")]
    Sem {
        op: &'static str,
        source: std::io::Error,
    },

    /// A mapped segment is smaller than its declared contents.
    #[error("segment '{name}' truncated: {actual} bytes, expected at least {expected}")]
    SegmentTruncated {
        name: String,
        actual: usize,
        expected: usize,
    },

    /// Invalid run configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A child process could not be spawned.
    #[error("failed to spawn '{path}': {source}")]
    Spawn {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GridlockError>;
