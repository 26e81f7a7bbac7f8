//! Thin wrappers over process-shared POSIX semaphores.
//!
//! Every wrapper retries `EINTR` internally: an interrupted wait is a
//! transient condition, not an error the caller should see.

use shared::{GridlockError, Result};
use std::io;
use std::time::Duration;

/// Outcome of a timed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The signal was (or already had been) posted.
    Granted,
    /// The timeout elapsed with no signal.
    TimedOut,
}

/// Initialize a semaphore living in shared memory (pshared).
///
/// # Safety
/// `sem` must point into a mapped, writable shared region and must not be
/// concurrently accessed until initialization returns.
pub(crate) unsafe fn init(sem: *mut libc::sem_t, value: u32) -> Result<()> {
    if libc::sem_init(sem, 1, value) != 0 {
        return Err(sem_err("init"));
    }
    Ok(())
}

/// # Safety
/// `sem` must point to an initialized semaphore in a live mapping.
pub(crate) unsafe fn wait(sem: *mut libc::sem_t) -> Result<()> {
    loop {
        if libc::sem_wait(sem) == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(GridlockError::Sem {
            op: "wait",
            source: err,
        });
    }
}

/// # Safety
/// `sem` must point to an initialized semaphore in a live mapping.
pub(crate) unsafe fn post(sem: *mut libc::sem_t) -> Result<()> {
    if libc::sem_post(sem) != 0 {
        return Err(sem_err("post"));
    }
    Ok(())
}

/// Wait with a deadline `timeout` from now.
///
/// # Safety
/// `sem` must point to an initialized semaphore in a live mapping.
pub(crate) unsafe fn wait_timeout(sem: *mut libc::sem_t, timeout: Duration) -> Result<WaitOutcome> {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    if libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) != 0 {
        return Err(sem_err("clock_gettime"));
    }
    let nanos = now.tv_nsec as i64 + timeout.subsec_nanos() as i64;
    let deadline = libc::timespec {
        tv_sec: now.tv_sec
            + timeout.as_secs() as libc::time_t
            + (nanos / 1_000_000_000) as libc::time_t,
        tv_nsec: (nanos % 1_000_000_000) as libc::c_long,
    };
    loop {
        if libc::sem_timedwait(sem, &deadline) == 0 {
            return Ok(WaitOutcome::Granted);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => continue,
            Some(libc::ETIMEDOUT) => return Ok(WaitOutcome::TimedOut),
            _ => {
                return Err(GridlockError::Sem {
                    op: "timedwait",
                    source: err,
                })
            }
        }
    }
}

/// # Safety
/// `sem` must point to an initialized semaphore nobody is waiting on.
pub(crate) unsafe fn destroy(sem: *mut libc::sem_t) {
    libc::sem_destroy(sem);
}

fn sem_err(op: &'static str) -> GridlockError {
    GridlockError::Sem {
        op,
        source: io::Error::last_os_error(),
    }
}
