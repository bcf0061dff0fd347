// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! POSIX shared memory segment management.
//!
//! Provides safe wrappers around `shm_open`, `ftruncate`, and `mmap`
//! for creating and mapping the per-topic ring-buffer segments.
//!
//! # Segment Lifecycle
//!
//! 1. The first party (writer or reader) creates the segment with
//!    [`ShmSegment::open_or_create`] and wins the init race
//! 2. Later parties map the same object; the kernel zero-fills new
//!    segments, which is a valid empty ring
//! 3. The mapping is released on drop
//! 4. The transport that *created* a segment unlinks it on teardown;
//!    segments created by other processes are left intact
//!
//! # Naming Convention
//!
//! Segment names start with `/` and are derived deterministically from
//! the domain id and topic name (see [`super::segment_name`]).
//! Example: `/tiny_dds_42_sensor_data`

use super::{Result, ShmError};
use std::ffi::CString;
use std::io;
use std::ptr;

/// POSIX shared memory segment wrapper.
///
/// Automatically unmaps the memory region on drop.
/// Does NOT automatically unlink the segment (caller's responsibility).
pub struct ShmSegment {
    /// Pointer to mapped memory region
    ptr: *mut u8,
    /// Size of the mapping
    size: usize,
    /// Segment name (for unlink)
    name: String,
}

// SAFETY: ShmSegment's pointer refers to shared memory accessed from
// multiple threads and processes. All cross-party synchronization is
// performed by the ring-buffer header atomics stored inside the segment.
unsafe impl Send for ShmSegment {}
unsafe impl Sync for ShmSegment {}

impl ShmSegment {
    /// Open the named segment, creating it if it does not exist yet.
    ///
    /// Returns the mapped segment and whether this call created the
    /// object. Creation is probed with `O_CREAT | O_EXCL` so the caller
    /// knows which segments it owns and must unlink on teardown. Freshly
    /// created segments are zero-filled by the kernel, which is a valid
    /// empty ring buffer.
    ///
    /// # Arguments
    ///
    /// * `name` - Segment name (must start with `/`)
    /// * `size` - Size in bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the segment cannot be created, sized, or mapped.
    pub fn open_or_create(name: &str, size: usize) -> Result<(Self, bool)> {
        Self::validate_name(name)?;

        let c_name = CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))?;

        // SAFETY:
        // - c_name is a valid null-terminated CString created above
        // - shm_open with O_CREAT|O_EXCL|O_RDWR either creates a fresh
        //   segment or fails with EEXIST; mode 0o600 is a valid mask
        // - the return value is a valid fd on success or -1 (checked below)
        let mut fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600,
            )
        };
        let mut created = true;

        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EEXIST) {
                return Err(ShmError::SegmentCreate(err));
            }
            // Lost the creation race (or the object predates us): open it.
            created = false;
            // SAFETY:
            // - c_name is a valid null-terminated CString
            // - O_RDWR without O_CREAT opens an existing object; mode is ignored
            fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
            if fd < 0 {
                return Err(ShmError::SegmentOpen(io::Error::last_os_error()));
            }
        }

        if created {
            // SAFETY:
            // - fd is a valid descriptor from the successful shm_open above
            // - size as off_t is bounded by practical segment sizes; ftruncate
            //   fails gracefully if the kernel rejects it
            let ret = unsafe { libc::ftruncate(fd, size as libc::off_t) };
            if ret < 0 {
                let err = io::Error::last_os_error();
                // SAFETY: fd is still valid and unused after this error path
                unsafe {
                    libc::close(fd);
                    libc::shm_unlink(c_name.as_ptr());
                }
                return Err(ShmError::SegmentCreate(err));
            }
        }

        // SAFETY:
        // - null first argument lets the kernel pick the address
        // - PROT_READ | PROT_WRITE with MAP_SHARED is a valid read-write
        //   shared mapping visible to other processes
        // - fd is valid from shm_open/ftruncate above, offset 0 maps from
        //   the start of the object
        // - mmap returns MAP_FAILED on error (checked below)
        let mapped = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        // SAFETY: the mapping (when it succeeded) keeps its own reference
        // to the object; closing fd here is always safe and required to
        // avoid leaking the descriptor
        unsafe { libc::close(fd) };

        if mapped == libc::MAP_FAILED {
            if created {
                // SAFETY: c_name is valid; unlinking our half-made object
                // only touches the filesystem namespace
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
            }
            return Err(ShmError::Mmap(io::Error::last_os_error()));
        }

        log::debug!(
            "[SHM] mapped segment name={} size={} created={}",
            name,
            size,
            created
        );

        Ok((
            Self {
                ptr: mapped as *mut u8,
                size,
                name: name.to_string(),
            },
            created,
        ))
    }

    /// Validate that a segment name is acceptable to `shm_open`.
    ///
    /// Topic-derived names may contain embedded `/` (the sanitizer keeps
    /// them by contract); `shm_open` itself rejects those at runtime on
    /// platforms that care.
    fn validate_name(name: &str) -> Result<()> {
        if !name.starts_with('/') {
            return Err(ShmError::InvalidName(format!(
                "segment name must start with '/': {name}"
            )));
        }
        if name.len() > 255 {
            return Err(ShmError::InvalidName(format!(
                "segment name too long (max 255): {name}"
            )));
        }
        Ok(())
    }

    /// Unlink (delete) a shared memory segment by name.
    ///
    /// The object is removed once every process unmaps it. Called by the
    /// transport that created the segment during teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if unlink fails (a missing segment is not an error).
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))?;

        // SAFETY:
        // - c_name is a valid null-terminated CString
        // - shm_unlink only touches the filesystem namespace and is safe
        //   to call for nonexistent objects (error handled below)
        let ret = unsafe { libc::shm_unlink(c_name.as_ptr()) };

        if ret < 0 {
            let err = io::Error::last_os_error();
            // Not found is OK (idempotent cleanup)
            if err.kind() != io::ErrorKind::NotFound {
                return Err(ShmError::SegmentOpen(err));
            }
        }

        Ok(())
    }

    /// Get raw pointer to the mapped memory
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Get the size of the mapping
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the segment name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if a segment with the given name exists
    #[must_use]
    pub fn exists(name: &str) -> bool {
        let Ok(c_name) = CString::new(name) else {
            return false;
        };

        // SAFETY:
        // - c_name is a valid null-terminated CString
        // - O_RDONLY without O_CREAT only probes for existence
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };

        if fd >= 0 {
            // SAFETY: fd is valid (>= 0) and not used after this point
            unsafe { libc::close(fd) };
            true
        } else {
            false
        }
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        // SAFETY:
        // - self.ptr was obtained from a successful mmap in open_or_create
        // - self.size is the exact size passed to mmap
        // - Drop runs once, so the region is not unmapped twice
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.size);
        }
        // Note: no unlink here. The owning transport unlinks the segments
        // it created during teardown.
    }
}
