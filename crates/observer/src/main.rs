//! Gridlock observer.
//!
//! Attaches to both segments read-only with respect to the game, then
//! renders a frame per update-ready signal and acknowledges it with
//! render-complete. Exits after rendering a game-over frame, which the
//! orchestrator guarantees to publish at least once.

mod render;

use shared::{state_segment_name, sync_segment_name};
use state::StateSegment;
use std::time::Duration;
use sync::{SyncSegment, WaitOutcome};
use tracing::{info, warn};

/// The update wait is timed so a wedged orchestrator cannot hang this
/// process.
const UPDATE_WAIT: Duration = Duration::from_millis(500);
/// Consecutive silent waits tolerated before giving up on the run.
const MAX_SILENT_WAITS: u32 = 240;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let state = StateSegment::attach(&state_segment_name(), false)?;
    let sync = SyncSegment::attach(&sync_segment_name())?;

    let mut silent = 0u32;
    loop {
        match sync.wait_update_timeout(UPDATE_WAIT)? {
            WaitOutcome::TimedOut => {
                silent += 1;
                // Game over can be observed even if its signal was missed.
                let guard = sync.read()?;
                let over = state.view(&guard).header.is_over();
                drop(guard);
                if over {
                    info!("game over observed without a frame signal");
                    return Ok(());
                }
                if silent >= MAX_SILENT_WAITS {
                    warn!("no frames for too long, giving up");
                    return Ok(());
                }
                continue;
            }
            WaitOutcome::Granted => silent = 0,
        }

        let over = {
            let guard = sync.read()?;
            let view = state.view(&guard);
            print!("{}", render::frame(&view));
            view.header.is_over()
        };
        sync.signal_render_complete()?;
        if over {
            info!("final frame rendered");
            return Ok(());
        }
    }
}
