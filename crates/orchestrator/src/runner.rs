//! The round loop: INIT (segments + children) → RUNNING (round-robin
//! grants, move collection, timeout enforcement) → GAME_OVER (ordered
//! teardown and the final ranking).

use crate::config::Config;
use crate::process::{AgentProcess, ObserverProcess, TurnInput};
use crate::summary::{StopCause, Summary};
use rules::Dir;
use shared::{Result, PASS_SENTINEL};
use state::StateSegment;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sync::SyncSegment;
use tracing::{debug, info};

/// Upper bound on waiting for the observer to acknowledge a frame, so a
/// slow or dead observer cannot stall the round loop.
const FRAME_WAIT: Duration = Duration::from_millis(250);

/// One run, from segment creation to the final ranking.
///
/// Field order matters: the state segment must unmap and unlink before the
/// sync segment does.
pub struct Runner {
    cfg: Config,
    state: StateSegment,
    sync: SyncSegment,
    agents: Vec<AgentProcess>,
    observer: Option<ObserverProcess>,
    stop: Arc<AtomicBool>,
    /// Next slot to consider, for round-robin fairness across rounds.
    cursor: usize,
}

impl Runner {
    /// INIT: create both segments (sync first — the lock must exist before
    /// anyone can touch the state), spawn the children, record each
    /// agent's pid and name in its slot, compute the initial blocked
    /// flags, and publish the first frame.
    pub fn new(cfg: Config, stop: Arc<AtomicBool>) -> Result<Self> {
        let sync = SyncSegment::create(&cfg.sync_segment)?;
        let mut state = StateSegment::create(
            &cfg.state_segment,
            cfg.width,
            cfg.height,
            cfg.agents.len() as u32,
            cfg.seed,
        )?;

        let observer = match &cfg.view {
            Some(path) => Some(ObserverProcess::spawn(
                path,
                &cfg.state_segment,
                &cfg.sync_segment,
            )?),
            None => None,
        };

        let mut agents = Vec::with_capacity(cfg.agents.len());
        for path in &cfg.agents {
            agents.push(AgentProcess::spawn(
                path,
                cfg.width,
                cfg.height,
                &cfg.state_segment,
                &cfg.sync_segment,
            )?);
        }

        {
            let guard = sync.write()?;
            let mut g = state.edit(&guard);
            for (slot, agent) in agents.iter().enumerate() {
                let rec = &mut g.header.agents[slot];
                rec.pid = agent.pid();
                rec.set_name(&agent.name());
            }
            let n = g.header.agent_count as usize;
            for slot in 0..n {
                let blocked = !rules::can_move(&g.as_view(), slot);
                g.header.agents[slot].set_blocked(blocked);
            }
        }
        info!(
            width = cfg.width,
            height = cfg.height,
            agents = agents.len(),
            seed = cfg.seed,
            "run initialized"
        );

        let runner = Self {
            cfg,
            state,
            sync,
            agents,
            observer,
            stop,
            cursor: 0,
        };
        runner.frame_sync()?;
        Ok(runner)
    }

    /// RUNNING until a termination condition, then GAME_OVER teardown.
    pub fn run(mut self) -> Result<Summary> {
        let mut rounds = 0u32;
        let mut last_valid = Instant::now();

        let cause = 'game: loop {
            if self.stop.load(Ordering::SeqCst) {
                break StopCause::Cancelled;
            }
            if !self.agents.iter().any(|a| a.is_alive()) {
                break StopCause::AllDead;
            }
            let order = self.turn_order()?;
            if order.is_empty() {
                break StopCause::AllBlocked;
            }
            if rounds >= self.cfg.max_rounds {
                break StopCause::RoundCap;
            }

            for slot in order {
                // Cancellation and the global clock are observed between
                // turns; an in-flight turn finishes its window first.
                if self.stop.load(Ordering::SeqCst) {
                    break 'game StopCause::Cancelled;
                }
                if let Some(window) = self.cfg.global_timeout {
                    if last_valid.elapsed() >= window {
                        break 'game StopCause::GlobalTimeout;
                    }
                }
                // An earlier turn this round may have killed or walled in
                // this agent.
                if !self.agents[slot].is_alive() || self.is_blocked(slot)? {
                    continue;
                }
                self.take_turn(slot, rounds, &mut last_valid)?;
            }
            rounds += 1;
        };

        self.teardown(rounds, cause)
    }

    /// Grant one turn and settle its outcome.
    fn take_turn(&mut self, slot: usize, round: u32, last_valid: &mut Instant) -> Result<()> {
        self.sync.grant_turn(slot)?;
        self.cursor = (slot + 1) % self.agents.len();

        match self.agents[slot].read_move(self.cfg.turn_wait()) {
            TurnInput::Move(byte) => self.handle_move(slot, round, byte, last_valid)?,
            TurnInput::TimedOut => {
                // Only a configured per-agent timeout is charged; the plain
                // poll window expiring just forfeits the turn.
                if self.cfg.agent_timeout.is_some() {
                    let guard = self.sync.write()?;
                    let mut g = self.state.edit(&guard);
                    g.header.agents[slot].timeouts += 1;
                    debug!(round, slot, timeouts = g.header.agents[slot].timeouts, "turn timed out");
                }
            }
            TurnInput::Closed => {
                info!(round, slot, "agent exited");
            }
        }
        Ok(())
    }

    /// Settle one received protocol byte under the write lock.
    fn handle_move(
        &mut self,
        slot: usize,
        round: u32,
        byte: u8,
        last_valid: &mut Instant,
    ) -> Result<()> {
        {
            let guard = self.sync.write()?;
            let mut g = self.state.edit(&guard);

            if byte == PASS_SENTINEL {
                // Self-reported pass: blocked immediately, no recompute.
                g.header.agents[slot].set_blocked(true);
                debug!(round, slot, "pass, marked blocked");
            } else if let Some(dir) = Dir::from_byte(byte) {
                if rules::apply(&mut g, slot, dir) {
                    *last_valid = Instant::now();
                    // A capture can wall in a neighbor: recompute every
                    // slot's mobility, not just the mover's.
                    let n = g.header.agent_count as usize;
                    for i in 0..n {
                        let blocked = !rules::can_move(&g.as_view(), i);
                        g.header.agents[i].set_blocked(blocked);
                    }
                    let rec = &g.header.agents[slot];
                    debug!(
                        round,
                        slot,
                        dir = byte,
                        score = rec.score,
                        x = rec.x,
                        y = rec.y,
                        "valid move"
                    );
                } else {
                    g.header.agents[slot].invalid_moves += 1;
                    debug!(
                        round,
                        slot,
                        dir = byte,
                        invalid = g.header.agents[slot].invalid_moves,
                        "invalid move"
                    );
                }
            } else {
                // 8..=0xFE is outside the protocol: scored as invalid.
                g.header.agents[slot].invalid_moves += 1;
                debug!(round, slot, byte, "byte outside protocol");
            }
        }
        self.frame_sync()
    }

    /// GAME_OVER: flag the state, publish the final frame, wake every
    /// gate, terminate and reap the children, then build the ranking.
    /// The segments unlink when `self` drops, state before sync.
    fn teardown(mut self, rounds: u32, cause: StopCause) -> Result<Summary> {
        info!(rounds, %cause, "game over");
        {
            let guard = self.sync.write()?;
            let g = self.state.edit(&guard);
            g.header.game_over = 1;
        }
        // The observer is guaranteed to see game_over at least once.
        if self.observer.is_some() {
            self.sync.signal_update()?;
        }
        // Agents parked on their gates must wake to observe game_over.
        for slot in 0..self.agents.len() {
            self.sync.grant_turn(slot)?;
        }
        for agent in &self.agents {
            agent.terminate();
        }
        for agent in &mut self.agents {
            agent.reap();
        }
        if let Some(observer) = &mut self.observer {
            observer.reap();
        }

        let summary = {
            let guard = self.sync.read()?;
            let view = self.state.view(&guard);
            Summary::from_view(&view, rounds, cause)
        };
        Ok(summary)
    }

    /// Live, unblocked slots in round-robin order from the cursor.
    fn turn_order(&self) -> Result<Vec<usize>> {
        let guard = self.sync.read()?;
        let view = self.state.view(&guard);
        let n = self.agents.len();
        let mut order = Vec::new();
        for k in 0..n {
            let slot = (self.cursor + k) % n;
            if self.agents[slot].is_alive() && !view.header.agents[slot].is_blocked() {
                order.push(slot);
            }
        }
        Ok(order)
    }

    fn is_blocked(&self, slot: usize) -> Result<bool> {
        let guard = self.sync.read()?;
        let view = self.state.view(&guard);
        Ok(view.header.agents[slot].is_blocked())
    }

    /// Publish a frame to the observer and wait (bounded) for the previous
    /// one to be acknowledged. No observer, no handshake.
    fn frame_sync(&self) -> Result<()> {
        if self.observer.is_none() {
            return Ok(());
        }
        self.sync.signal_update()?;
        let _ = self.sync.wait_render_complete_timeout(FRAME_WAIT)?;
        Ok(())
    }
}
