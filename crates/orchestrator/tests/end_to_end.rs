//! Whole-run tests driving the runner against throwaway agent
//! executables (shell scripts speaking the one-byte protocol).

use orchestrator::{Config, Runner, StopCause};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "#!/bin/sh\n{body}").unwrap();
    drop(f);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config(tag: &str, agents: Vec<PathBuf>) -> Config {
    Config {
        width: 12,
        height: 8,
        delay: Duration::from_millis(200),
        global_timeout: None,
        agent_timeout: None,
        seed: 42,
        view: None,
        max_rounds: 200,
        json: false,
        agents,
        state_segment: format!("/gridlock_e2e_{tag}_state_{}", std::process::id()),
        sync_segment: format!("/gridlock_e2e_{tag}_sync_{}", std::process::id()),
    }
}

fn no_stop() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[test]
fn test_all_pass_terminates_in_one_round() {
    let dir = tempfile::tempdir().unwrap();
    let passer = script(&dir, "passer", r"while :; do printf '\377'; done");
    let cfg = config("allpass", vec![passer.clone(), passer.clone(), passer]);

    let summary = Runner::new(cfg, no_stop()).unwrap().run().unwrap();

    assert_eq!(summary.cause, StopCause::AllBlocked);
    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.agents.len(), 3);
    for a in &summary.agents {
        assert!(a.blocked);
        assert_eq!(a.score, 0);
        assert_eq!(a.valid_moves, 0);
    }
}

#[test]
fn test_mover_scores_then_dies() {
    let dir = tempfile::tempdir().unwrap();
    // Three eastward moves, then exit: EOF means death, not blocked.
    let mover = script(&dir, "mover", r"printf '\002\002\002'");
    let cfg = config("mover", vec![mover]);

    let summary = Runner::new(cfg, no_stop()).unwrap().run().unwrap();

    assert_eq!(summary.cause, StopCause::AllDead);
    let a = &summary.agents[0];
    assert_eq!(a.valid_moves, 3);
    assert_eq!(a.invalid_moves, 0);
    // Start anchor for a 12x8 board is (2,1); three steps east.
    assert_eq!((a.x, a.y), (5, 1));
    // Every destination carried a reward on a fresh board.
    assert!(a.score > 0);
    assert_eq!(a.name, "mover");
}

#[test]
fn test_silent_agent_accumulates_one_timeout_per_round() {
    let dir = tempfile::tempdir().unwrap();
    let sleeper = script(&dir, "sleeper", "exec sleep 30");
    let mut cfg = config("sleeper", vec![sleeper]);
    cfg.agent_timeout = Some(Duration::from_millis(50));
    cfg.max_rounds = 3;

    let summary = Runner::new(cfg, no_stop()).unwrap().run().unwrap();

    assert_eq!(summary.cause, StopCause::RoundCap);
    assert_eq!(summary.rounds, 3);
    let a = &summary.agents[0];
    assert_eq!(a.timeouts, 3);
    assert_eq!(a.score, 0);
    assert_eq!((a.x, a.y), (2, 1));
    assert!(!a.blocked);
}

#[test]
fn test_global_timeout_without_valid_moves() {
    let dir = tempfile::tempdir().unwrap();
    let sleeper = script(&dir, "sleeper", "exec sleep 30");
    let mut cfg = config("global", vec![sleeper]);
    cfg.delay = Duration::from_millis(50);
    cfg.global_timeout = Some(Duration::from_millis(400));

    let summary = Runner::new(cfg, no_stop()).unwrap().run().unwrap();

    assert_eq!(summary.cause, StopCause::GlobalTimeout);
    // No per-agent timeout configured: expiring poll windows are not
    // charged.
    assert_eq!(summary.agents[0].timeouts, 0);
}

#[test]
fn test_bytes_outside_protocol_score_invalid() {
    let dir = tempfile::tempdir().unwrap();
    // Two undefined bytes, then a voluntary pass.
    let junk = script(&dir, "junk", r"printf '\011\011\377'");
    let cfg = config("junk", vec![junk]);

    let summary = Runner::new(cfg, no_stop()).unwrap().run().unwrap();

    assert_eq!(summary.cause, StopCause::AllBlocked);
    let a = &summary.agents[0];
    assert_eq!(a.invalid_moves, 2);
    assert_eq!(a.valid_moves, 0);
    assert!(a.blocked);
}

#[test]
fn test_preset_stop_token_cancels_before_any_round() {
    let dir = tempfile::tempdir().unwrap();
    let sleeper = script(&dir, "sleeper", "exec sleep 30");
    let cfg = config("cancel", vec![sleeper]);

    let stop = Arc::new(AtomicBool::new(false));
    stop.store(true, Ordering::SeqCst);
    let summary = Runner::new(cfg, stop).unwrap().run().unwrap();

    assert_eq!(summary.cause, StopCause::Cancelled);
    assert_eq!(summary.rounds, 0);
}

#[test]
fn test_mixed_field_ranks_by_score() {
    let dir = tempfile::tempdir().unwrap();
    let mover = script(&dir, "mover", r"printf '\002\002'");
    let passer = script(&dir, "passer", r"while :; do printf '\377'; done");
    let cfg = config("mixed", vec![mover, passer]);

    let summary = Runner::new(cfg, no_stop()).unwrap().run().unwrap();

    // The mover captured rewards, the passer none: slot 0 ranks first.
    assert_eq!(summary.agents[0].slot, 0);
    assert_eq!(summary.agents[0].rank, 1);
    assert_eq!(summary.agents[1].slot, 1);
    assert!(summary.agents[0].score > summary.agents[1].score);
}
