//! # Gridlock Sync
//!
//! The synchronization segment: one fixed-size shared-memory block holding
//! everything the processes block on.
//!
//! Two independent concerns share the block:
//!
//! - A **writer-priority reader-writer lock** guarding the game-state
//!   segment. Readers never block each other; a writer closes a turnstile
//!   before waiting for exclusive access, so a continuous stream of readers
//!   cannot starve it. Sections are strictly nested RAII guards
//!   ([`ReadGuard`] / [`WriteGuard`]); reentrant acquisition is not
//!   supported and must not be attempted.
//! - **Turn gates and the frame handshake**: one counting signal per agent
//!   slot (the orchestrator posts to grant a turn, the agent waits) plus
//!   the update-ready / render-complete pair between orchestrator and
//!   observer. Signals are retained: a post with no waiter present is
//!   consumed by the next wait, so there is no lost-wakeup race between
//!   "grant turn" and "begin waiting".

mod segment;
mod sem;

pub use segment::{ReadGuard, SyncSegment, WriteGuard};
pub use sem::WaitOutcome;
