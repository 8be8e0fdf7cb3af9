// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! POSIX shared memory segment management.
//!
//! Safe wrappers around `shm_open`, `ftruncate`, and `mmap`. Unlike a
//! transport that tolerates a stale segment from a crashed peer, this
//! coordination layer's lifecycle requires the supervisor's creation to fail
//! deterministically when a segment of the same name already exists, so
//! `create` never unlinks first.

use crate::error::{IpcError, Result};
use std::ffi::CString;
use std::io;
use std::ptr;

/// A mapped POSIX shared memory segment.
///
/// Unmaps on drop. Never unlinks on drop; unlinking is the creator's
/// responsibility, performed explicitly during shutdown.
pub struct ShmSegment {
    ptr: *mut u8,
    size: usize,
    name: String,
}

// SAFETY: the mapped region is shared across processes; all access to its
// contents goes through the layout in `region.rs`, which partitions writers
// across the named semaphores so no two processes touch the same bytes.
unsafe impl Send for ShmSegment {}
unsafe impl Sync for ShmSegment {}

impl ShmSegment {
    /// Create a new segment with exclusive intent. Fails if a segment with
    /// this name already exists.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        Self::validate_name(name)?;
        let c_name = CString::new(name).map_err(|_| IpcError::InvalidName(name.to_string()))?;

        // SAFETY: c_name is a valid NUL-terminated string; O_CREAT|O_EXCL
        // atomically fails with EEXIST if the segment is already present,
        // which is exactly the "fail if any already exists" lifecycle rule.
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_EXCL,
                0o600,
            )
        };
        if fd < 0 {
            return Err(IpcError::SegmentCreate(io::Error::last_os_error()));
        }

        // SAFETY: fd is a valid descriptor from the shm_open above; size is
        // caller-provided and bounded by the fixed layout size.
        let ret = unsafe { libc::ftruncate(fd, size as libc::off_t) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            // SAFETY: fd valid, not reused after this error path.
            unsafe { libc::close(fd) };
            return Err(IpcError::SegmentCreate(err));
        }

        let ptr = Self::map(fd, size)?;

        // SAFETY: fd is valid; mapping already holds a reference, closing fd
        // does not invalidate it.
        unsafe { libc::close(fd) };

        // SAFETY: ptr points to exactly `size` freshly mapped bytes with
        // write permission.
        unsafe { ptr::write_bytes(ptr, 0, size) };

        Ok(Self {
            ptr,
            size,
            name: name.to_string(),
        })
    }

    /// Attach to an existing segment. Fails if it does not exist.
    pub fn open(name: &str, size: usize) -> Result<Self> {
        Self::validate_name(name)?;
        let c_name = CString::new(name).map_err(|_| IpcError::InvalidName(name.to_string()))?;

        // SAFETY: c_name valid; no O_CREAT, so this only succeeds against an
        // existing segment.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                return Err(IpcError::NotFound(name.to_string()));
            }
            return Err(IpcError::SegmentOpen(err));
        }

        let ptr = Self::map(fd, size)?;
        // SAFETY: see create().
        unsafe { libc::close(fd) };

        Ok(Self {
            ptr,
            size,
            name: name.to_string(),
        })
    }

    fn map(fd: libc::c_int, size: usize) -> Result<*mut u8> {
        // SAFETY: fd is a valid fd backing a segment at least `size` bytes
        // (via the caller's prior ftruncate or an existing segment of the
        // agreed fixed layout size); PROT_READ|WRITE and MAP_SHARED are the
        // only flags needed for a region attached by multiple processes.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(IpcError::Mmap(io::Error::last_os_error()));
        }
        Ok(ptr as *mut u8)
    }

    fn validate_name(name: &str) -> Result<()> {
        if !name.starts_with('/') {
            return Err(IpcError::InvalidName(format!(
                "segment name must start with '/': {name}"
            )));
        }
        if name.len() > 1 && name[1..].contains('/') {
            return Err(IpcError::InvalidName(format!(
                "segment name cannot contain '/' after the prefix: {name}"
            )));
        }
        if name.len() > 255 {
            return Err(IpcError::InvalidName(format!(
                "segment name too long (max 255): {name}"
            )));
        }
        Ok(())
    }

    /// Unlink a segment by name. Not-found is treated as benign: the
    /// shutdown protocol calls this unconditionally and should not fail if
    /// another process already removed the name.
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = CString::new(name).map_err(|_| IpcError::InvalidName(name.to_string()))?;
        // SAFETY: c_name valid; shm_unlink only touches the filesystem
        // namespace, safe regardless of whether the name exists.
        let ret = unsafe { libc::shm_unlink(c_name.as_ptr()) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(IpcError::SegmentOpen(err));
            }
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        // SAFETY: self.ptr/self.size were obtained from a successful mmap in
        // create() or open() and have not been unmapped before.
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.size);
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
        format!("/coloring3_test_seg_{ts}")
    }

    #[test]
    fn validate_name_rules() {
        assert!(ShmSegment::validate_name("/foo").is_ok());
        assert!(ShmSegment::validate_name("foo").is_err());
        assert!(ShmSegment::validate_name("/foo/bar").is_err());
    }

    #[test]
    fn create_fails_if_already_exists() {
        let name = unique_name();
        let seg1 = ShmSegment::create(&name, 4096).expect("first create");
        let second = ShmSegment::create(&name, 4096);
        assert!(second.is_err());
        drop(seg1);
        ShmSegment::unlink(&name).ok();
    }

    #[test]
    fn create_then_open_shares_memory() {
        let name = unique_name();
        let size = 4096;
        let seg1 = ShmSegment::create(&name, size).expect("create");
        // SAFETY: seg1 owns a fresh 4096-byte mapping.
        unsafe {
            *seg1.as_ptr() = 0x42;
        }
        let seg2 = ShmSegment::open(&name, size).expect("open");
        // SAFETY: seg2 maps the same segment written above.
        unsafe {
            assert_eq!(*seg2.as_ptr(), 0x42);
        }
        drop(seg1);
        drop(seg2);
        ShmSegment::unlink(&name).ok();
    }

    #[test]
    fn open_nonexistent_is_not_found() {
        let result = ShmSegment::open("/coloring3_test_missing_xyz", 4096);
        assert!(matches!(result, Err(IpcError::NotFound(_))));
    }

    #[test]
    fn unlink_is_idempotent() {
        let name = unique_name();
        let _seg = ShmSegment::create(&name, 4096).expect("create");
        assert!(ShmSegment::unlink(&name).is_ok());
        assert!(ShmSegment::unlink(&name).is_ok());
    }
}
