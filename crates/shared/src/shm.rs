//! Raw POSIX shared-memory mapping.
//!
//! Both Gridlock segments sit on the same primitive: a named shm object
//! created (and later unlinked) by the orchestrator, and attached by agents
//! and the observer. Attachers size the mapping from the object's reported
//! size, never from a compiled-in constant, because board dimensions are
//! run-specific.

use crate::{GridlockError, Result};
use std::ffi::CString;
use std::io;
use std::ptr::NonNull;

/// A mapped POSIX shared-memory object.
///
/// Unmaps on drop. The name is unlinked on drop only by the handle that
/// created the object; attachers must tolerate the name disappearing
/// underneath them (their mapping stays valid until they unmap).
#[derive(Debug)]
pub struct ShmSegment {
    name: String,
    ptr: NonNull<libc::c_void>,
    len: usize,
    owner: bool,
    writable: bool,
}

// The segment is a raw region explicitly shared between processes; all
// access discipline lives in the layers above (sync guards).
unsafe impl Send for ShmSegment {}
unsafe impl Sync for ShmSegment {}

impl ShmSegment {
    /// Create (or truncate) a named object of `len` bytes and map it
    /// read-write. The region is zero-filled, even when the name already
    /// existed with stale contents from a crashed run.
    pub fn create(name: &str, len: usize) -> Result<Self> {
        let c_name = shm_name(name)?;
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_CREAT | libc::O_RDWR, 0o600) };
        if fd < 0 {
            return Err(shm_err(name, "shm_open"));
        }
        if unsafe { libc::ftruncate(fd, len as libc::off_t) } != 0 {
            let err = shm_err(name, "ftruncate");
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(err);
        }
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        unsafe { libc::close(fd) };
        if ptr == libc::MAP_FAILED {
            let err = shm_err(name, "mmap");
            unsafe { libc::shm_unlink(c_name.as_ptr()) };
            return Err(err);
        }
        unsafe { std::ptr::write_bytes(ptr as *mut u8, 0, len) };
        Ok(Self {
            name: name.to_string(),
            // MAP_FAILED was checked above
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            len,
            owner: true,
            writable: true,
        })
    }

    /// Attach to an existing named object, sizing the mapping via fstat.
    pub fn attach(name: &str, writable: bool) -> Result<Self> {
        let c_name = shm_name(name)?;
        let oflag = if writable { libc::O_RDWR } else { libc::O_RDONLY };
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), oflag, 0o600) };
        if fd < 0 {
            return Err(shm_err(name, "shm_open"));
        }
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut st) } != 0 {
            let err = shm_err(name, "fstat");
            unsafe { libc::close(fd) };
            return Err(err);
        }
        let len = st.st_size as usize;
        let prot = if writable {
            libc::PROT_READ | libc::PROT_WRITE
        } else {
            libc::PROT_READ
        };
        let ptr = unsafe { libc::mmap(std::ptr::null_mut(), len, prot, libc::MAP_SHARED, fd, 0) };
        unsafe { libc::close(fd) };
        if ptr == libc::MAP_FAILED {
            return Err(shm_err(name, "mmap"));
        }
        Ok(Self {
            name: name.to_string(),
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            len,
            owner: false,
            writable,
        })
    }

    /// Size of the mapping in bytes (the object's reported size on attach).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this handle created (and will unlink) the object.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Whether the mapping is writable.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Base pointer of the mapping. Callers layer their own layout and
    /// locking discipline on top.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr() as *mut u8
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr(), self.len);
        }
        if self.owner {
            if let Ok(c_name) = shm_name(&self.name) {
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
            }
        }
    }
}

fn shm_name(name: &str) -> Result<CString> {
    CString::new(name)
        .map_err(|_| GridlockError::Config(format!("shm name '{name}' contains a NUL byte")))
}

fn shm_err(name: &str, op: &'static str) -> GridlockError {
    GridlockError::Shm {
        name: name.to_string(),
        op,
        source: io::Error::last_os_error(),
    }
}
