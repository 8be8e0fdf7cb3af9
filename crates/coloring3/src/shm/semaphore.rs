// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Named POSIX counting semaphores.
//!
//! Thin `sem_open`/`sem_wait`/`sem_post` wrappers, in the same shape this
//! workspace uses for other raw syscalls: a small struct, `Result`-returning
//! methods, explicit SAFETY comments, Drop closes the handle but never
//! unlinks it.

use crate::error::{IpcError, Result};
use std::ffi::CString;
use std::io;

/// Outcome of a blocking wait on a named semaphore.
///
/// `wait` on a named semaphore can return early with `EINTR` when a signal
/// is delivered. Callers must not treat this as success or as a hard
/// failure; they decide locally whether to retry or unwind based on this
/// distinct outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The semaphore was decremented; the caller holds the reservation.
    Acquired,
    /// The wait returned early due to a delivered signal; no state changed.
    Interrupted,
}

/// A named POSIX counting semaphore.
pub struct NamedSemaphore {
    handle: *mut libc::sem_t,
    name: String,
}

// SAFETY: sem_t operations are defined to be safe for concurrent use by
// multiple threads and processes; the handle itself carries no other
// process-local state.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a named semaphore with exclusive intent and the given initial
    /// value. Fails if a semaphore of this name already exists.
    pub fn create(name: &str, initial_value: u32) -> Result<Self> {
        let c_name = CString::new(name).map_err(|_| IpcError::InvalidName(name.to_string()))?;
        // SAFETY: c_name is a valid NUL-terminated string. O_CREAT|O_EXCL
        // atomically fails with EEXIST if already present, matching the
        // "supervisor creates, failing if any already exists" lifecycle rule.
        let handle = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600,
                initial_value,
            )
        };
        if handle == libc::SEM_FAILED {
            return Err(IpcError::SemaphoreCreate(
                name.to_string(),
                io::Error::last_os_error(),
            ));
        }
        Ok(Self {
            handle: handle.cast(),
            name: name.to_string(),
        })
    }

    /// Attach to an existing named semaphore. Fails if it does not exist.
    pub fn open(name: &str) -> Result<Self> {
        let c_name = CString::new(name).map_err(|_| IpcError::InvalidName(name.to_string()))?;
        // SAFETY: c_name valid; no O_CREAT, so this only succeeds against an
        // existing semaphore created by the supervisor.
        let handle = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        if handle == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                return Err(IpcError::NotFound(name.to_string()));
            }
            return Err(IpcError::SemaphoreOpen(name.to_string(), err));
        }
        Ok(Self {
            handle: handle.cast(),
            name: name.to_string(),
        })
    }

    /// Block until the semaphore can be decremented, or a signal interrupts
    /// the wait.
    pub fn wait(&self) -> WaitOutcome {
        // SAFETY: self.handle is a valid sem_t* obtained from a successful
        // sem_open and not yet closed.
        let ret = unsafe { libc::sem_wait(self.handle) };
        if ret == 0 {
            return WaitOutcome::Acquired;
        }
        // EINTR is the only expected failure mode here; any other errno
        // indicates a misused handle. This helper only reports interruption
        // vs. success; the caller decides how to treat anything else.
        WaitOutcome::Interrupted
    }

    /// Increment the semaphore, waking at most one waiter.
    pub fn post(&self) -> Result<()> {
        // SAFETY: self.handle valid per above.
        let ret = unsafe { libc::sem_post(self.handle) };
        if ret != 0 {
            return Err(IpcError::SemaphoreOp(
                self.name.clone(),
                io::Error::last_os_error(),
            ));
        }
        Ok(())
    }

    /// Read the current value. Used only by the shutdown wake loop to bound
    /// how many extra posts are needed.
    pub fn value(&self) -> Result<i32> {
        let mut val: libc::c_int = 0;
        // SAFETY: self.handle valid; val is a valid out-pointer.
        let ret = unsafe { libc::sem_getvalue(self.handle, &mut val) };
        if ret != 0 {
            return Err(IpcError::SemaphoreOp(
                self.name.clone(),
                io::Error::last_os_error(),
            ));
        }
        Ok(val)
    }

    /// Unlink a semaphore by name. Not-found is benign.
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = CString::new(name).map_err(|_| IpcError::InvalidName(name.to_string()))?;
        // SAFETY: c_name valid; sem_unlink only touches the kernel namespace.
        let ret = unsafe { libc::sem_unlink(c_name.as_ptr()) };
        if ret != 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(IpcError::SemaphoreOp(name.to_string(), err));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: self.handle was obtained from a successful sem_open and is
        // closed at most once (Drop runs once).
        unsafe {
            libc::sem_close(self.handle);
        }
        // We do NOT unlink here; the supervisor unlinks explicitly on shutdown.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("/coloring3_test_sem_{ts}")
    }

    #[test]
    fn create_fails_if_already_exists() {
        let name = unique_name();
        let sem1 = NamedSemaphore::create(&name, 1).expect("first create");
        let second = NamedSemaphore::create(&name, 1);
        assert!(second.is_err());
        drop(sem1);
        NamedSemaphore::unlink(&name).ok();
    }

    #[test]
    fn post_then_wait_acquires() {
        let name = unique_name();
        let sem = NamedSemaphore::create(&name, 0).expect("create");
        sem.post().expect("post");
        assert_eq!(sem.wait(), WaitOutcome::Acquired);
        drop(sem);
        NamedSemaphore::unlink(&name).ok();
    }

    #[test]
    fn value_reflects_initial_value() {
        let name = unique_name();
        let sem = NamedSemaphore::create(&name, 10).expect("create");
        assert_eq!(sem.value().unwrap(), 10);
        drop(sem);
        NamedSemaphore::unlink(&name).ok();
    }

    #[test]
    fn open_nonexistent_is_not_found() {
        let result = NamedSemaphore::open("/coloring3_test_missing_xyz");
        assert!(matches!(result, Err(IpcError::NotFound(_))));
    }
}
