//! # Gridlock State
//!
//! The shared game-state store: one named shared-memory segment holding a
//! fixed header (dimensions, agent records, game-over flag) followed by the
//! row-major board.
//!
//! The store does no locking of its own. Access goes through [`GameView`]
//! and [`GameMut`], which can only be obtained from a [`StateSegment`]
//! while holding the corresponding guard from the sync segment — the lock
//! discipline is enforced at the type level, and there is no ambient
//! global handle.

pub mod layout;
pub mod segment;
pub mod setup;

pub use layout::*;
pub use segment::*;
