//! # Gridlock Orchestrator
//!
//! The master side of a run: parses configuration, creates both shared
//! segments, spawns the agent and observer processes, drives the
//! round-robin turn loop, and tears everything down in order.
//!
//! Exposed as a library so the integration tests can drive complete runs
//! in-process against throwaway agent executables.

pub mod config;
pub mod process;
pub mod runner;
pub mod summary;

pub use config::{Cli, Config};
pub use runner::Runner;
pub use summary::{StopCause, Summary};
