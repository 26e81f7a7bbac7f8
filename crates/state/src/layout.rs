//! On-segment layout of the game state and the board cell encoding.

use shared::MAX_AGENTS;
use std::mem;

/// Bytes reserved for an agent's name (NUL-padded).
pub const AGENT_NAME_LEN: usize = 16;

/// Board cell encoding:
/// - `v > 0`  — uncaptured reward in 1..=9
/// - `v == 0` — free
/// - `v < 0`  — captured, owner `(-v) - 1`
///
/// Every cell is in exactly one of the three states; no cell can encode
/// two owners.
pub fn cell_owner(v: i32) -> Option<usize> {
    if v < 0 {
        Some((-v - 1) as usize)
    } else {
        None
    }
}

/// Reward of a cell (0 for free or captured cells).
pub fn cell_reward(v: i32) -> i32 {
    if v > 0 {
        v
    } else {
        0
    }
}

/// Encode a cell captured by `owner`.
pub fn make_captured(owner: usize) -> i32 {
    -(owner as i32) - 1
}

/// One agent slot. Fixed size; lives in the shared header array.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AgentRecord {
    pub name: [u8; AGENT_NAME_LEN],
    /// Monotonically non-decreasing.
    pub score: u32,
    pub valid_moves: u32,
    pub invalid_moves: u32,
    pub timeouts: u32,
    /// Current position; always a cell this agent owns.
    pub x: u16,
    pub y: u16,
    /// Pid of the external agent process, used for slot self-discovery.
    pub pid: i32,
    /// Non-zero when no legal move exists from the current position.
    blocked: u8,
    _pad: [u8; 3],
}

impl AgentRecord {
    pub fn is_blocked(&self) -> bool {
        self.blocked != 0
    }

    pub fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked as u8;
    }

    /// Store a name, truncated to the slot width (one byte kept for NUL).
    pub fn set_name(&mut self, name: &str) {
        self.name = [0; AGENT_NAME_LEN];
        let bytes = name.as_bytes();
        let n = bytes.len().min(AGENT_NAME_LEN - 1);
        self.name[..n].copy_from_slice(&bytes[..n]);
    }

    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(AGENT_NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

/// Fixed header of the state segment; the board follows contiguously.
#[repr(C)]
#[derive(Debug)]
pub struct StateHeader {
    pub width: u32,
    pub height: u32,
    pub agent_count: u32,
    /// 0 while the game runs, 1 once the orchestrator ends it.
    pub game_over: u32,
    pub agents: [AgentRecord; MAX_AGENTS],
}

impl StateHeader {
    /// A zeroed header with the run parameters filled in. Used by the
    /// creating orchestrator and by tests building local states.
    pub fn new(width: u32, height: u32, agent_count: u32) -> Self {
        // Plain-old-data: all-zero is a valid value for every field.
        let mut header: StateHeader = unsafe { mem::zeroed() };
        header.width = width;
        header.height = height;
        header.agent_count = agent_count;
        header
    }

    pub fn is_over(&self) -> bool {
        self.game_over != 0
    }
}

/// Total segment size for a `width` x `height` board.
pub fn state_size(width: u32, height: u32) -> usize {
    mem::size_of::<StateHeader>() + width as usize * height as usize * mem::size_of::<i32>()
}
