//! ASCII rendering of one frame.

use state::{cell_owner, GameView};
use std::fmt::Write;

/// Render the board and the per-agent stat lines.
///
/// Cells: digits are uncaptured rewards, `.` is free, lowercase letters
/// are captured territory, an uppercase letter is the owning agent
/// standing on it.
pub fn frame(view: &GameView<'_>) -> String {
    let mut out = String::new();
    let h = view.header;
    let _ = writeln!(out, "gridlock {}x{} agents={}", h.width, h.height, h.agent_count);

    for y in 0..h.height {
        for x in 0..h.width {
            out.push(cell_char(view, x, y));
        }
        out.push('\n');
    }

    for slot in 0..h.agent_count as usize {
        let rec = &h.agents[slot];
        let _ = writeln!(
            out,
            "{} {:<16} score={:<5} valid={} invalid={} timeouts={} pos=({},{}){}",
            (b'A' + slot as u8) as char,
            rec.name_str(),
            rec.score,
            rec.valid_moves,
            rec.invalid_moves,
            rec.timeouts,
            rec.x,
            rec.y,
            if rec.is_blocked() { " blocked" } else { "" },
        );
    }
    if h.is_over() {
        out.push_str("GAME OVER\n");
    }
    out
}

fn cell_char(view: &GameView<'_>, x: u32, y: u32) -> char {
    let v = view.board[view.idx(x, y)];
    match cell_owner(v) {
        Some(owner) => {
            let rec = &view.header.agents[owner];
            if (rec.x as u32, rec.y as u32) == (x, y) {
                (b'A' + owner as u8) as char
            } else {
                (b'a' + owner as u8) as char
            }
        }
        None if v == 0 => '.',
        None => char::from_digit(v as u32, 10).unwrap_or('?'),
    }
}
