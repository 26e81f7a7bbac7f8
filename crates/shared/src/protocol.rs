//! Agent-byte protocol and segment naming.
//!
//! An agent sends exactly one byte per granted turn on its private pipe:
//! `0..=7` is a compass direction (0 = north, increasing clockwise in 45°
//! steps), [`PASS_SENTINEL`] is a voluntary pass ("no legal move"), and
//! closing the pipe means the agent exited. Bytes `8..=0xFE` are not part
//! of the protocol and score as invalid moves.

/// Maximum number of agent slots. Fixed by the protocol.
pub const MAX_AGENTS: usize = 9;

/// Number of move directions; bytes below this are direction codes.
pub const DIR_COUNT: u8 = 8;

/// Reserved byte an agent sends to declare it has no legal move.
pub const PASS_SENTINEL: u8 = 0xFF;

/// Default name of the game-state shm segment.
pub const STATE_SEGMENT: &str = "/gridlock_state";

/// Default name of the synchronization shm segment.
pub const SYNC_SEGMENT: &str = "/gridlock_sync";

/// Environment override for the state segment name.
///
/// The orchestrator sets this on every child it spawns, so one machine can
/// host several concurrent runs (and integration tests stay isolated).
pub const STATE_SEGMENT_ENV: &str = "GRIDLOCK_STATE_SEGMENT";

/// Environment override for the sync segment name.
pub const SYNC_SEGMENT_ENV: &str = "GRIDLOCK_SYNC_SEGMENT";

/// The state segment name for this process: env override or the default.
pub fn state_segment_name() -> String {
    std::env::var(STATE_SEGMENT_ENV).unwrap_or_else(|_| STATE_SEGMENT.to_string())
}

/// The sync segment name for this process: env override or the default.
pub fn sync_segment_name() -> String {
    std::env::var(SYNC_SEGMENT_ENV).unwrap_or_else(|_| SYNC_SEGMENT.to_string())
}
