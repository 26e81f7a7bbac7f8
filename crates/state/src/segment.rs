//! The mapped state segment and its guard-gated views.

use crate::layout::{state_size, StateHeader};
use crate::setup;
use shared::{GridlockError, Result, ShmSegment, MAX_AGENTS};
use std::mem;
use sync::{ReadGuard, WriteGuard};

/// Read-only picture of the game. Only obtainable while a lock guard is
/// held (or, in tests, from local buffers).
pub struct GameView<'a> {
    pub header: &'a StateHeader,
    pub board: &'a [i32],
}

impl<'a> GameView<'a> {
    pub fn new(header: &'a StateHeader, board: &'a [i32]) -> Self {
        Self { header, board }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.header.width && (y as u32) < self.header.height
    }

    /// Row-major index of an in-bounds cell.
    pub fn idx(&self, x: u32, y: u32) -> usize {
        (y * self.header.width + x) as usize
    }

    /// Cell value at `(x, y)`, or None when out of bounds.
    pub fn cell(&self, x: i32, y: i32) -> Option<i32> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(self.board[self.idx(x as u32, y as u32)])
    }

    /// Number of cells still carrying a reward.
    pub fn remaining_rewards(&self) -> usize {
        self.board.iter().filter(|&&v| v > 0).count()
    }
}

/// Mutable access to the game. Only obtainable while the write guard is
/// held.
pub struct GameMut<'a> {
    pub header: &'a mut StateHeader,
    pub board: &'a mut [i32],
}

impl<'a> GameMut<'a> {
    pub fn new(header: &'a mut StateHeader, board: &'a mut [i32]) -> Self {
        Self { header, board }
    }

    pub fn as_view(&self) -> GameView<'_> {
        GameView {
            header: self.header,
            board: self.board,
        }
    }
}

/// Handle to the game-state segment.
///
/// The orchestrator creates it (which also seeds the board and places the
/// agents); agents and the observer attach read-only. Dropping the creating
/// handle unmaps and unlinks the segment.
pub struct StateSegment {
    seg: ShmSegment,
}

impl StateSegment {
    /// Create the named segment for a `width` x `height` board with
    /// `agent_count` agents, seed the rewards from `seed` (same seed, same
    /// board), and place the agents on the anchor grid.
    ///
    /// Runs before any peer process exists, so no lock is required here.
    pub fn create(name: &str, width: u32, height: u32, agent_count: u32, seed: u64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GridlockError::Config(format!(
                "board {width}x{height} has no cells"
            )));
        }
        if agent_count == 0 || agent_count as usize > MAX_AGENTS {
            return Err(GridlockError::Config(format!(
                "agent count {agent_count} outside 1..={MAX_AGENTS}"
            )));
        }
        if (width as u64) * (height as u64) < agent_count as u64 {
            return Err(GridlockError::Config(format!(
                "board {width}x{height} cannot seat {agent_count} agents"
            )));
        }
        let seg = ShmSegment::create(name, state_size(width, height))?;
        let mut this = Self { seg };
        {
            let (header, board) = this.parts_mut();
            header.width = width;
            header.height = height;
            header.agent_count = agent_count;
            header.game_over = 0;
            setup::seed_board(board, seed);
            setup::place_agents(header, board);
        }
        Ok(this)
    }

    /// Attach to an existing segment, verifying the reported size covers
    /// the header plus the board the header declares.
    pub fn attach(name: &str, writable: bool) -> Result<Self> {
        let seg = ShmSegment::attach(name, writable)?;
        if seg.len() < mem::size_of::<StateHeader>() {
            return Err(GridlockError::SegmentTruncated {
                name: name.to_string(),
                actual: seg.len(),
                expected: mem::size_of::<StateHeader>(),
            });
        }
        let this = Self { seg };
        let header = unsafe { &*(this.seg.as_ptr() as *const StateHeader) };
        let expected = state_size(header.width, header.height);
        if this.seg.len() < expected {
            return Err(GridlockError::SegmentTruncated {
                name: name.to_string(),
                actual: this.seg.len(),
                expected,
            });
        }
        Ok(this)
    }

    /// Read the game under a read (or write) section.
    pub fn view<'a>(&'a self, _lock: &'a ReadGuard<'_>) -> GameView<'a> {
        let (header, board) = self.parts();
        GameView { header, board }
    }

    /// Read the game while holding the write lock (a writer may read).
    pub fn view_under_write<'a>(&'a self, _lock: &'a WriteGuard<'_>) -> GameView<'a> {
        let (header, board) = self.parts();
        GameView { header, board }
    }

    /// Mutate the game under the write section. Only the creating
    /// orchestrator maps the segment writable.
    pub fn edit<'a>(&'a mut self, _lock: &'a WriteGuard<'_>) -> GameMut<'a> {
        assert!(
            self.seg.is_writable(),
            "state segment '{}' was attached read-only",
            self.seg.name()
        );
        let (header, board) = self.parts_mut();
        GameMut { header, board }
    }

    fn parts(&self) -> (&StateHeader, &[i32]) {
        unsafe {
            let header = &*(self.seg.as_ptr() as *const StateHeader);
            let cells = (header.width * header.height) as usize;
            let board = std::slice::from_raw_parts(
                self.seg.as_ptr().add(mem::size_of::<StateHeader>()) as *const i32,
                cells,
            );
            (header, board)
        }
    }

    fn parts_mut(&mut self) -> (&mut StateHeader, &mut [i32]) {
        unsafe {
            let header = &mut *(self.seg.as_ptr() as *mut StateHeader);
            let cells = (header.width * header.height) as usize;
            let board = std::slice::from_raw_parts_mut(
                self.seg.as_ptr().add(mem::size_of::<StateHeader>()) as *mut i32,
                cells,
            );
            (header, board)
        }
    }
}
