//! Child-process supervision: spawning agents and the observer, the
//! per-turn pipe read, and exactly-once reaping.

use shared::{GridlockError, Result, STATE_SEGMENT_ENV, SYNC_SEGMENT_ENV};
use std::io::Read;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a granted turn produced on the agent's pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnInput {
    /// One protocol byte arrived.
    Move(u8),
    /// Nothing arrived within the wait window.
    TimedOut,
    /// The pipe reached end-of-file or a hard error: the agent is gone.
    Closed,
}

/// A spawned agent process and the read end of its private move pipe.
pub struct AgentProcess {
    child: Child,
    pipe: Option<ChildStdout>,
    path: PathBuf,
    reaped: bool,
}

impl AgentProcess {
    /// Spawn an agent with its stdout as the move pipe. Board dimensions
    /// travel as argv (informational); the segment names travel in the
    /// environment so an overridden run stays self-contained.
    pub fn spawn(
        path: &Path,
        width: u32,
        height: u32,
        state_segment: &str,
        sync_segment: &str,
    ) -> Result<Self> {
        let mut child = Command::new(path)
            .arg(width.to_string())
            .arg(height.to_string())
            .env(STATE_SEGMENT_ENV, state_segment)
            .env(SYNC_SEGMENT_ENV, sync_segment)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| GridlockError::Spawn {
                path: path.display().to_string(),
                source,
            })?;
        let pipe = child.stdout.take();
        Ok(Self {
            child,
            pipe,
            path: path.to_path_buf(),
            reaped: false,
        })
    }

    pub fn pid(&self) -> i32 {
        self.child.id() as i32
    }

    /// Basename of the binary, for the shared-state name slot.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// True while the move pipe is open.
    pub fn is_alive(&self) -> bool {
        self.pipe.is_some()
    }

    /// Wait up to `timeout` for the one move byte of a granted turn.
    ///
    /// A hard read error is treated like end-of-file: either way this
    /// agent can no longer play, and participant failure never propagates.
    pub fn read_move(&mut self, timeout: Duration) -> TurnInput {
        let pipe = match self.pipe.as_mut() {
            Some(pipe) => pipe,
            None => return TurnInput::Closed,
        };
        match poll_readable(pipe.as_raw_fd(), timeout) {
            Ok(true) => {}
            Ok(false) => return TurnInput::TimedOut,
            Err(err) => {
                warn!(agent = %self.path.display(), error = %err, "pipe poll failed");
                self.close_pipe();
                return TurnInput::Closed;
            }
        }
        let mut buf = [0u8; 1];
        match pipe.read(&mut buf) {
            Ok(1) => TurnInput::Move(buf[0]),
            Ok(_) => {
                self.close_pipe();
                TurnInput::Closed
            }
            Err(err) => {
                warn!(agent = %self.path.display(), error = %err, "pipe read failed");
                self.close_pipe();
                TurnInput::Closed
            }
        }
    }

    fn close_pipe(&mut self) {
        self.pipe = None;
    }

    /// Ask the process to exit. Errors (already gone) are ignored.
    pub fn terminate(&self) {
        unsafe {
            libc::kill(self.pid(), libc::SIGTERM);
        }
    }

    /// Wait for the process, exactly once; later calls are no-ops.
    pub fn reap(&mut self) {
        if self.reaped {
            return;
        }
        self.reaped = true;
        match self.child.wait() {
            Ok(status) => debug!(agent = %self.path.display(), %status, "agent reaped"),
            Err(err) => warn!(agent = %self.path.display(), error = %err, "wait failed"),
        }
    }
}

impl Drop for AgentProcess {
    fn drop(&mut self) {
        // Backstop against leak on an early error path.
        if !self.reaped {
            self.terminate();
            self.reap();
        }
    }
}

/// The optional observer. It needs nothing beyond the segment names; it is
/// never killed, only waited on — it exits itself after the final frame.
pub struct ObserverProcess {
    child: Child,
    path: PathBuf,
    reaped: bool,
}

impl ObserverProcess {
    pub fn spawn(path: &Path, state_segment: &str, sync_segment: &str) -> Result<Self> {
        let child = Command::new(path)
            .env(STATE_SEGMENT_ENV, state_segment)
            .env(SYNC_SEGMENT_ENV, sync_segment)
            .spawn()
            .map_err(|source| GridlockError::Spawn {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            child,
            path: path.to_path_buf(),
            reaped: false,
        })
    }

    pub fn reap(&mut self) {
        if self.reaped {
            return;
        }
        self.reaped = true;
        match self.child.wait() {
            Ok(status) => debug!(observer = %self.path.display(), %status, "observer reaped"),
            Err(err) => warn!(observer = %self.path.display(), error = %err, "wait failed"),
        }
    }
}

impl Drop for ObserverProcess {
    fn drop(&mut self) {
        if !self.reaped {
            self.terminate();
            self.reap();
        }
    }
}

impl ObserverProcess {
    fn terminate(&self) {
        unsafe {
            libc::kill(self.child.id() as i32, libc::SIGTERM);
        }
    }
}

/// Block until `fd` is readable (or hung up) or the timeout elapses.
/// EINTR is retried with the remaining window.
fn poll_readable(fd: i32, timeout: Duration) -> std::io::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ms = remaining.as_millis().min(i32::MAX as u128) as i32;
        let rv = unsafe { libc::poll(&mut pfd, 1, ms) };
        if rv > 0 {
            return Ok(true);
        }
        if rv == 0 {
            return Ok(false);
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh\n{body}").unwrap();
        drop(f);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_spawn_reads_one_byte_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "two_moves", r"printf '\002\005'");
        let mut agent = AgentProcess::spawn(&path, 10, 10, "/s", "/y").unwrap();
        assert_eq!(
            agent.read_move(Duration::from_secs(2)),
            TurnInput::Move(2)
        );
        assert_eq!(
            agent.read_move(Duration::from_secs(2)),
            TurnInput::Move(5)
        );
        assert_eq!(agent.read_move(Duration::from_secs(2)), TurnInput::Closed);
        assert!(!agent.is_alive());
        agent.reap();
    }

    #[test]
    fn test_silent_agent_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "sleeper", "exec sleep 10");
        let mut agent = AgentProcess::spawn(&path, 10, 10, "/s", "/y").unwrap();
        let start = Instant::now();
        assert_eq!(
            agent.read_move(Duration::from_millis(50)),
            TurnInput::TimedOut
        );
        assert!(start.elapsed() >= Duration::from_millis(40));
        // Still alive: a timeout does not close the pipe.
        assert!(agent.is_alive());
        agent.terminate();
        agent.reap();
    }

    #[test]
    fn test_missing_binary_is_a_spawn_error() {
        let err = AgentProcess::spawn(Path::new("/nonexistent/agent"), 4, 4, "/s", "/y");
        assert!(matches!(err, Err(GridlockError::Spawn { .. })));
    }

    #[test]
    fn test_reap_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "quick", "exit 0");
        let mut agent = AgentProcess::spawn(&path, 10, 10, "/s", "/y").unwrap();
        agent.reap();
        agent.reap();
    }
}
