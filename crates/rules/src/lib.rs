//! # Gridlock Rules
//!
//! Pure functions over the game state: move legality, move application,
//! and the mobility check behind the `blocked` flag. Stateless and
//! lock-free — callers reach these through views that only exist while
//! the appropriate lock guard is held.

use shared::DIR_COUNT;
use state::{cell_owner, cell_reward, make_captured, GameMut, GameView};

/// One of the eight compass directions, 0 = north increasing clockwise in
/// 45° steps. This is also the wire encoding on the agent byte channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Dir {
    N = 0,
    Ne = 1,
    E = 2,
    Se = 3,
    S = 4,
    Sw = 5,
    W = 6,
    Nw = 7,
}

impl Dir {
    pub const ALL: [Dir; DIR_COUNT as usize] = [
        Dir::N,
        Dir::Ne,
        Dir::E,
        Dir::Se,
        Dir::S,
        Dir::Sw,
        Dir::W,
        Dir::Nw,
    ];

    /// Decode a wire byte. Out-of-range direction codes are rejected here,
    /// at the type boundary — the engine never sees them.
    pub fn from_byte(b: u8) -> Option<Dir> {
        match b {
            0 => Some(Dir::N),
            1 => Some(Dir::Ne),
            2 => Some(Dir::E),
            3 => Some(Dir::Se),
            4 => Some(Dir::S),
            5 => Some(Dir::Sw),
            6 => Some(Dir::W),
            7 => Some(Dir::Nw),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Unit step for this direction; y grows downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::N => (0, -1),
            Dir::Ne => (1, -1),
            Dir::E => (1, 0),
            Dir::Se => (1, 1),
            Dir::S => (0, 1),
            Dir::Sw => (-1, 1),
            Dir::W => (-1, 0),
            Dir::Nw => (-1, -1),
        }
    }
}

/// Check whether `agent` may move in `dir`. Legal moves return the gain:
/// the destination's reward, 0 for a free cell. Illegal when the agent
/// index is out of range, the destination is off the board, or the
/// destination is already captured by anyone (including the agent itself).
pub fn validate(g: &GameView<'_>, agent: usize, dir: Dir) -> Option<i32> {
    if agent >= g.header.agent_count as usize {
        return None;
    }
    let rec = &g.header.agents[agent];
    let (dx, dy) = dir.delta();
    let v = g.cell(rec.x as i32 + dx, rec.y as i32 + dy)?;
    if cell_owner(v).is_some() {
        return None;
    }
    Some(cell_reward(v))
}

/// Apply a move: position, capture, score, valid counter. Re-validates
/// internally as a defense against stale or corrupted callers; an invalid
/// move mutates nothing and returns false (the orchestrator charges the
/// invalid counter in that case).
pub fn apply(g: &mut GameMut<'_>, agent: usize, dir: Dir) -> bool {
    let gain = match validate(&g.as_view(), agent, dir) {
        Some(gain) => gain,
        None => return false,
    };
    let (dx, dy) = dir.delta();
    let (nx, ny) = {
        let rec = &g.header.agents[agent];
        (rec.x as i32 + dx, rec.y as i32 + dy)
    };
    let idx = g.as_view().idx(nx as u32, ny as u32);
    g.board[idx] = make_captured(agent);

    let rec = &mut g.header.agents[agent];
    rec.x = nx as u16;
    rec.y = ny as u16;
    rec.score += gain as u32;
    rec.valid_moves += 1;
    true
}

/// True iff at least one of the eight directions validates. The sole basis
/// for the `blocked` flag; the orchestrator recomputes it at game start and
/// after every applied move.
pub fn can_move(g: &GameView<'_>, agent: usize) -> bool {
    Dir::ALL.iter().any(|&dir| validate(g, agent, dir).is_some())
}
