//! Run configuration: CLI surface and the resolved settings.

use clap::Parser;
use shared::{state_segment_name, sync_segment_name, GridlockError, Result, MAX_AGENTS};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Command-line surface of the `gridlock` binary.
#[derive(Parser, Debug)]
#[command(name = "gridlock")]
#[command(about = "Multi-process territory-capture arena over shared memory")]
pub struct Cli {
    /// Board width in cells
    #[arg(short, long, default_value_t = 10)]
    pub width: u32,

    /// Board height in cells
    #[arg(long, default_value_t = 10)]
    pub height: u32,

    /// Per-turn poll window in milliseconds
    #[arg(short, long, default_value_t = 200)]
    pub delay: u64,

    /// Global inter-valid-move timeout in seconds; 0 disables it
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Per-agent response timeout in milliseconds; 0 means wait the full
    /// poll window without charging a timeout
    #[arg(long, default_value_t = 0)]
    pub agent_timeout: u64,

    /// Board seed; defaults to the wall clock
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Observer binary to spawn; no observer when absent
    #[arg(short = 'v', long)]
    pub view: Option<PathBuf>,

    /// Safety cap on total rounds
    #[arg(long, default_value_t = 200)]
    pub max_rounds: u32,

    /// Emit the final summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Agent binaries, one per slot
    #[arg(required = true)]
    pub agents: Vec<PathBuf>,
}

/// Resolved settings for one run. Built from [`Cli`] in the binary;
/// integration tests construct it directly.
#[derive(Debug, Clone)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    /// How long one granted turn may wait for a byte.
    pub delay: Duration,
    /// Run-wide deadline since the last valid move.
    pub global_timeout: Option<Duration>,
    /// When set, an expiring turn charges the agent one timeout.
    pub agent_timeout: Option<Duration>,
    pub seed: u64,
    pub view: Option<PathBuf>,
    pub max_rounds: u32,
    pub json: bool,
    pub agents: Vec<PathBuf>,
    /// Segment names, overridable through the environment so concurrent
    /// runs on one machine stay isolated.
    pub state_segment: String,
    pub sync_segment: String,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if cli.agents.len() > MAX_AGENTS {
            return Err(GridlockError::Config(format!(
                "{} agents given, at most {MAX_AGENTS} slots exist",
                cli.agents.len()
            )));
        }
        let seed = match cli.seed {
            Some(seed) => seed,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        Ok(Self {
            width: cli.width,
            height: cli.height,
            delay: Duration::from_millis(cli.delay),
            global_timeout: match cli.timeout {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            agent_timeout: match cli.agent_timeout {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            seed,
            view: cli.view,
            max_rounds: cli.max_rounds,
            json: cli.json,
            agents: cli.agents,
            state_segment: state_segment_name(),
            sync_segment: sync_segment_name(),
        })
    }

    /// The wait window for one granted turn.
    pub fn turn_wait(&self) -> Duration {
        self.agent_timeout.unwrap_or(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::from_cli(Cli::try_parse_from(args).unwrap()).unwrap()
    }

    #[test]
    fn test_default_config() {
        let cfg = parse(&["gridlock", "./player"]);
        assert_eq!(cfg.width, 10);
        assert_eq!(cfg.height, 10);
        assert_eq!(cfg.delay, Duration::from_millis(200));
        assert_eq!(cfg.global_timeout, Some(Duration::from_secs(10)));
        assert_eq!(cfg.agent_timeout, None);
        assert!(cfg.view.is_none());
        assert_eq!(cfg.max_rounds, 200);
        assert!(!cfg.json);
        assert_eq!(cfg.agents, vec![PathBuf::from("./player")]);
    }

    #[test]
    fn test_custom_config() {
        let cfg = parse(&[
            "gridlock", "-w", "25", "--height", "30", "-v", "./vista", "./p1", "./p2",
        ]);
        assert_eq!(cfg.width, 25);
        assert_eq!(cfg.height, 30);
        assert_eq!(cfg.delay, Duration::from_millis(200));
        assert_eq!(cfg.global_timeout, Some(Duration::from_secs(10)));
        assert_eq!(cfg.view, Some(PathBuf::from("./vista")));
        assert_eq!(
            cfg.agents,
            vec![PathBuf::from("./p1"), PathBuf::from("./p2")]
        );
    }

    #[test]
    fn test_zero_timeouts_disable() {
        let cfg = parse(&["gridlock", "-t", "0", "--agent-timeout", "0", "./p"]);
        assert_eq!(cfg.global_timeout, None);
        assert_eq!(cfg.agent_timeout, None);
        // With no per-agent timeout the turn wait falls back to the poll
        // window.
        assert_eq!(cfg.turn_wait(), cfg.delay);
    }

    #[test]
    fn test_agent_timeout_bounds_turn_wait() {
        let cfg = parse(&["gridlock", "--agent-timeout", "50", "./p"]);
        assert_eq!(cfg.turn_wait(), Duration::from_millis(50));
    }

    #[test]
    fn test_bad_argument() {
        assert!(Cli::try_parse_from(["gridlock", "-j", "./p1"]).is_err());
    }

    #[test]
    fn test_no_agents() {
        assert!(Cli::try_parse_from(["gridlock", "-w", "25"]).is_err());
    }

    #[test]
    fn test_too_many_agents() {
        let mut args = vec!["gridlock"];
        args.extend(["./p"; 10]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn test_fixed_seed_is_kept() {
        let cfg = parse(&["gridlock", "-s", "42", "./p"]);
        assert_eq!(cfg.seed, 42);
    }
}
