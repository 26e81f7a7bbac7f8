//! The synchronization block and its operations.

use crate::sem::{self, WaitOutcome};
use shared::{GridlockError, Result, ShmSegment, MAX_AGENTS};
use std::mem;
use std::ptr::addr_of_mut;
use std::time::Duration;

/// Layout of the synchronization segment. Fixed size regardless of board
/// dimensions.
#[repr(C)]
struct SyncBlock {
    /// Writer turnstile: a waiting writer holds this closed so no new
    /// readers are admitted (writer priority).
    turnstile: libc::sem_t,
    /// Exclusion between the writer and the reader group.
    write_excl: libc::sem_t,
    /// Protects `reader_count`.
    reader_mutex: libc::sem_t,
    /// Number of readers currently admitted.
    reader_count: i32,
    /// One counting turn gate per agent slot.
    turn_gates: [libc::sem_t; MAX_AGENTS],
    /// Orchestrator -> observer: a new frame may be rendered.
    update_ready: libc::sem_t,
    /// Observer -> orchestrator: the previous frame was rendered.
    render_complete: libc::sem_t,
}

/// Handle to the synchronization segment.
///
/// Created once by the orchestrator (before the game state, destroyed after
/// it); agents and the observer only attach. Dropping the creating handle
/// destroys the semaphores and unlinks the name.
pub struct SyncSegment {
    seg: ShmSegment,
}

impl SyncSegment {
    /// Create the named segment and initialize every primitive.
    ///
    /// Initialization failure is fatal to the caller: the lock and gates
    /// underpin everything downstream.
    pub fn create(name: &str) -> Result<Self> {
        let seg = ShmSegment::create(name, mem::size_of::<SyncBlock>())?;
        let block = seg.as_ptr() as *mut SyncBlock;
        unsafe {
            sem::init(addr_of_mut!((*block).turnstile), 1)?;
            sem::init(addr_of_mut!((*block).write_excl), 1)?;
            sem::init(addr_of_mut!((*block).reader_mutex), 1)?;
            (*block).reader_count = 0;
            for slot in 0..MAX_AGENTS {
                sem::init(addr_of_mut!((*block).turn_gates[slot]), 0)?;
            }
            sem::init(addr_of_mut!((*block).update_ready), 0)?;
            sem::init(addr_of_mut!((*block).render_complete), 0)?;
        }
        Ok(Self { seg })
    }

    /// Attach to an existing segment. The mapping must be writable even for
    /// read-only participants: waiting on a semaphore mutates it.
    pub fn attach(name: &str) -> Result<Self> {
        let seg = ShmSegment::attach(name, true)?;
        if seg.len() < mem::size_of::<SyncBlock>() {
            return Err(GridlockError::SegmentTruncated {
                name: name.to_string(),
                actual: seg.len(),
                expected: mem::size_of::<SyncBlock>(),
            });
        }
        Ok(Self { seg })
    }

    fn block(&self) -> *mut SyncBlock {
        self.seg.as_ptr() as *mut SyncBlock
    }

    // ----- reader-writer lock -----

    /// Enter a read section. Multiple readers run concurrently; a waiting
    /// writer closes the turnstile and stalls new readers at the entry.
    pub fn read(&self) -> Result<ReadGuard<'_>> {
        let b = self.block();
        unsafe {
            // Pass through the turnstile; a waiting writer holds it closed.
            sem::wait(addr_of_mut!((*b).turnstile))?;
            sem::post(addr_of_mut!((*b).turnstile))?;
            sem::wait(addr_of_mut!((*b).reader_mutex))?;
            (*b).reader_count += 1;
            if (*b).reader_count == 1 {
                // First reader locks writers out on behalf of the group.
                sem::wait(addr_of_mut!((*b).write_excl))?;
            }
            sem::post(addr_of_mut!((*b).reader_mutex))?;
        }
        Ok(ReadGuard { sync: self })
    }

    /// Enter the (single) write section. Blocks new readers immediately,
    /// then waits for already-admitted readers to drain.
    pub fn write(&self) -> Result<WriteGuard<'_>> {
        let b = self.block();
        unsafe {
            sem::wait(addr_of_mut!((*b).turnstile))?;
            sem::wait(addr_of_mut!((*b).write_excl))?;
        }
        Ok(WriteGuard { sync: self })
    }

    // ----- turn gates -----

    /// Grant agent `slot` its turn. Counting release: a grant issued before
    /// the agent waits is retained for its next wait.
    pub fn grant_turn(&self, slot: usize) -> Result<()> {
        let b = self.block();
        unsafe { sem::post(addr_of_mut!((*b).turn_gates[slot])) }
    }

    /// Block until agent `slot` is granted a turn.
    pub fn wait_turn(&self, slot: usize) -> Result<()> {
        let b = self.block();
        unsafe { sem::wait(addr_of_mut!((*b).turn_gates[slot])) }
    }

    /// Wait for a turn grant with a timeout.
    pub fn wait_turn_timeout(&self, slot: usize, timeout: Duration) -> Result<WaitOutcome> {
        let b = self.block();
        unsafe { sem::wait_timeout(addr_of_mut!((*b).turn_gates[slot]), timeout) }
    }

    // ----- frame handshake -----

    /// Orchestrator side: a new frame is ready to render.
    pub fn signal_update(&self) -> Result<()> {
        let b = self.block();
        unsafe { sem::post(addr_of_mut!((*b).update_ready)) }
    }

    /// Observer side: block until a frame is ready, with a timeout so a
    /// wedged orchestrator cannot hang the observer.
    pub fn wait_update_timeout(&self, timeout: Duration) -> Result<WaitOutcome> {
        let b = self.block();
        unsafe { sem::wait_timeout(addr_of_mut!((*b).update_ready), timeout) }
    }

    /// Observer side: the frame was rendered (back-pressure).
    pub fn signal_render_complete(&self) -> Result<()> {
        let b = self.block();
        unsafe { sem::post(addr_of_mut!((*b).render_complete)) }
    }

    /// Orchestrator side: wait for the observer to finish the previous
    /// frame, bounded so a slow or dead observer cannot stall the round
    /// loop.
    pub fn wait_render_complete_timeout(&self, timeout: Duration) -> Result<WaitOutcome> {
        let b = self.block();
        unsafe { sem::wait_timeout(addr_of_mut!((*b).render_complete), timeout) }
    }
}

impl Drop for SyncSegment {
    fn drop(&mut self) {
        if !self.seg.is_owner() {
            return;
        }
        let b = self.block();
        unsafe {
            sem::destroy(addr_of_mut!((*b).turnstile));
            sem::destroy(addr_of_mut!((*b).write_excl));
            sem::destroy(addr_of_mut!((*b).reader_mutex));
            for slot in 0..MAX_AGENTS {
                sem::destroy(addr_of_mut!((*b).turn_gates[slot]));
            }
            sem::destroy(addr_of_mut!((*b).update_ready));
            sem::destroy(addr_of_mut!((*b).render_complete));
        }
    }
}

/// Proof that the holder is inside a read section. Game-state views only
/// exist while one of these is alive.
pub struct ReadGuard<'a> {
    sync: &'a SyncSegment,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        let b = self.sync.block();
        unsafe {
            let _ = sem::wait(addr_of_mut!((*b).reader_mutex));
            (*b).reader_count -= 1;
            if (*b).reader_count == 0 {
                // Last reader out re-admits writers.
                let _ = sem::post(addr_of_mut!((*b).write_excl));
            }
            let _ = sem::post(addr_of_mut!((*b).reader_mutex));
        }
    }
}

/// Proof that the holder is inside the write section.
pub struct WriteGuard<'a> {
    sync: &'a SyncSegment,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let b = self.sync.block();
        unsafe {
            let _ = sem::post(addr_of_mut!((*b).write_excl));
            let _ = sem::post(addr_of_mut!((*b).turnstile));
        }
    }
}
