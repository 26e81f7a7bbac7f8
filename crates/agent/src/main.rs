//! Gridlock reference agent.
//!
//! Attaches to both shared segments, finds its own slot by pid, and then
//! plays: wait for a turn grant, read the board under the read lock, send
//! one move byte on stdout. Stdout is the move channel, so all logging
//! goes to stderr.

mod strategy;

use shared::{state_segment_name, sync_segment_name, Result, PASS_SENTINEL};
use state::StateSegment;
use std::io::Write;
use std::time::Duration;
use sync::{SyncSegment, WaitOutcome};
use tracing::{debug, info};

const DISCOVERY_TRIES: u32 = 200;
const DISCOVERY_BACKOFF: Duration = Duration::from_millis(50);
/// Gate waits run in short slices so game-over is noticed promptly even
/// when no turn ever arrives.
const TURN_WAIT_SLICE: Duration = Duration::from_millis(150);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Width and height arrive as argv, informational only; the state
    // segment is authoritative.
    let args: Vec<String> = std::env::args().skip(1).collect();
    debug!(?args, "starting");

    let state = StateSegment::attach(&state_segment_name(), false)?;
    let sync = SyncSegment::attach(&sync_segment_name())?;

    let slot = match discover_slot(&state, &sync)? {
        Some(slot) => slot,
        None => {
            // Not registered (or the game already ended): not an error,
            // there is just nothing to play.
            info!("no slot for this pid, exiting");
            return Ok(());
        }
    };
    info!(slot, "joined");

    play(&state, &sync, slot)
}

/// Find the slot whose record carries this process's pid. The orchestrator
/// writes the pid before the first grant, but this process can be
/// scheduled first, hence the bounded polling.
fn discover_slot(state: &StateSegment, sync: &SyncSegment) -> Result<Option<usize>> {
    let pid = std::process::id() as i32;
    for _ in 0..DISCOVERY_TRIES {
        {
            let guard = sync.read()?;
            let view = state.view(&guard);
            if view.header.is_over() {
                return Ok(None);
            }
            let n = view.header.agent_count as usize;
            for slot in 0..n {
                if view.header.agents[slot].pid == pid {
                    return Ok(Some(slot));
                }
            }
        }
        std::thread::sleep(DISCOVERY_BACKOFF);
    }
    Ok(None)
}

fn play(state: &StateSegment, sync: &SyncSegment, slot: usize) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    loop {
        match sync.wait_turn_timeout(slot, TURN_WAIT_SLICE)? {
            WaitOutcome::Granted => {}
            WaitOutcome::TimedOut => {
                let guard = sync.read()?;
                let view = state.view(&guard);
                if view.header.is_over() {
                    info!(slot, "game over");
                    return Ok(());
                }
                continue;
            }
        }

        let byte = {
            let guard = sync.read()?;
            let view = state.view(&guard);
            if view.header.is_over() {
                info!(slot, "game over");
                return Ok(());
            }
            match strategy::best_move(&view, slot) {
                Some(dir) => dir.as_byte(),
                None => PASS_SENTINEL,
            }
        };

        stdout.write_all(&[byte])?;
        stdout.flush()?;
        debug!(slot, byte, "move sent");
        // After a pass the orchestrator marks this slot blocked and stops
        // granting; the sliced gate wait above then rides out the rest of
        // the game and exits on game-over.
    }
}
