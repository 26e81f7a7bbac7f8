//! # Gridlock Shared
//!
//! Common types used across all Gridlock crates: the error type, the
//! agent-byte protocol constants, and the raw POSIX shared-memory mapping
//! both shared segments are built on.

pub mod error;
pub mod protocol;
pub mod shm;

// Re-exports
pub use error::*;
pub use protocol::*;
pub use shm::*;
