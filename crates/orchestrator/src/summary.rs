//! Final ranking: built from the shared state at teardown, printed as a
//! table or as JSON.

use serde::Serialize;
use state::GameView;
use std::fmt;

/// Why the run ended. All causes are normal termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCause {
    /// Every live agent is blocked.
    AllBlocked,
    /// No agent process is alive.
    AllDead,
    /// No valid move arrived within the global window.
    GlobalTimeout,
    /// The round watchdog fired.
    RoundCap,
    /// External stop request.
    Cancelled,
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopCause::AllBlocked => "all agents blocked",
            StopCause::AllDead => "all agents exited",
            StopCause::GlobalTimeout => "global timeout",
            StopCause::RoundCap => "round cap reached",
            StopCause::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One agent's final line in the ranking.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub rank: usize,
    pub slot: usize,
    pub name: String,
    pub score: u32,
    pub valid_moves: u32,
    pub invalid_moves: u32,
    pub timeouts: u32,
    pub x: u16,
    pub y: u16,
    pub blocked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub rounds: u32,
    pub cause: StopCause,
    pub agents: Vec<AgentSummary>,
}

impl Summary {
    /// Rank by descending score; ties keep slot order.
    pub fn from_view(view: &GameView<'_>, rounds: u32, cause: StopCause) -> Self {
        let n = view.header.agent_count as usize;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            let (sa, sb) = (view.header.agents[a].score, view.header.agents[b].score);
            sb.cmp(&sa).then(a.cmp(&b))
        });

        let agents = order
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                let rec = &view.header.agents[slot];
                AgentSummary {
                    rank: i + 1,
                    slot,
                    name: rec.name_str(),
                    score: rec.score,
                    valid_moves: rec.valid_moves,
                    invalid_moves: rec.invalid_moves,
                    timeouts: rec.timeouts,
                    x: rec.x,
                    y: rec.y,
                    blocked: rec.is_blocked(),
                }
            })
            .collect();

        Self {
            rounds,
            cause,
            agents,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "done after {} rounds ({})", self.rounds, self.cause)?;
        writeln!(
            f,
            "{:<4} {:<4} {:<16} {:>6} {:>6} {:>8} {:>8} {:>8} {:>7}",
            "rank", "slot", "name", "score", "valid", "invalid", "timeout", "pos", "blocked"
        )?;
        for a in &self.agents {
            writeln!(
                f,
                "{:<4} {:<4} {:<16} {:>6} {:>6} {:>8} {:>8} {:>8} {:>7}",
                a.rank,
                a.slot,
                a.name,
                a.score,
                a.valid_moves,
                a.invalid_moves,
                a.timeouts,
                format!("({},{})", a.x, a.y),
                a.blocked,
            )?;
        }
        Ok(())
    }
}
