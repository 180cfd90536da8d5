//! Tier backing storage.
//!
//! This module provides `BackingStore`, the byte array holding a tier's contents.
//! On Unix the store is an anonymous `mmap` so that large, sparsely touched tiers
//! only cost host memory for the pages actually written. Other platforms fall
//! back to a zeroed heap allocation.

use crate::common::{HumError, Result};
use crate::tier::Tier;

/// Zero-initialised byte storage for one tier.
///
/// Every access is bounds-checked against the store size; out-of-range
/// offsets are reported as [`HumError::TierOutOfBounds`] instead of panicking.
pub struct BackingStore {
    tier: Tier,
    ptr: *mut u8,
    size: usize,
}

// SAFETY: the store exclusively owns its allocation and exposes it only
// through `&self`/`&mut self` methods, so it can move between threads.
unsafe impl Send for BackingStore {}
// SAFETY: shared references only permit reads of the owned allocation.
unsafe impl Sync for BackingStore {}

impl std::fmt::Debug for BackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackingStore")
            .field("tier", &self.tier)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl BackingStore {
    /// Allocates `size` zeroed bytes for `tier`.
    ///
    /// # Errors
    ///
    /// [`HumError::Allocation`] if the host refuses the mapping or the size
    /// does not fit the address space.
    pub fn new(tier: Tier, size: u64) -> Result<Self> {
        let len = usize::try_from(size).map_err(|_| HumError::Allocation(size))?;
        if len == 0 {
            return Ok(Self {
                tier,
                ptr: std::ptr::NonNull::dangling().as_ptr(),
                size: 0,
            });
        }

        #[cfg(unix)]
        {
            // SAFETY: anonymous private mapping with no address hint; the
            // result is checked against MAP_FAILED before use.
            let ptr = unsafe {
                libc::mmap(
                    std::ptr::null_mut(),
                    len,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                    -1,
                    0,
                )
            };
            if ptr == libc::MAP_FAILED {
                return Err(HumError::Allocation(size));
            }
            Ok(Self {
                tier,
                ptr: ptr.cast::<u8>(),
                size: len,
            })
        }

        #[cfg(not(unix))]
        {
            let mut buf = std::mem::ManuallyDrop::new(vec![0u8; len].into_boxed_slice());
            Ok(Self {
                tier,
                ptr: buf.as_mut_ptr(),
                size: len,
            })
        }
    }

    /// Returns the size of the store in bytes.
    #[inline]
    pub const fn len(&self) -> u64 {
        self.size as u64
    }

    /// Returns `true` if the store holds no bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn span(&self, offset: u64, len: usize) -> Result<usize> {
        let out_of_bounds = || HumError::TierOutOfBounds {
            tier: self.tier,
            offset,
            len: len as u64,
            size: self.size as u64,
        };
        let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
        match start.checked_add(len) {
            Some(end) if end <= self.size => Ok(start),
            _ => Err(out_of_bounds()),
        }
    }

    /// Copies `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// # Errors
    ///
    /// [`HumError::TierOutOfBounds`] if the span exceeds the store.
    pub fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = self.span(offset, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        // SAFETY: `span` proved `[start, start + len)` lies inside the allocation,
        // and `buf` cannot alias it because the store owns its memory.
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.add(start), buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    /// Copies `data` into the store starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`HumError::TierOutOfBounds`] if the span exceeds the store.
    pub fn write_from(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let start = self.span(offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }
        // SAFETY: bounds checked by `span`; `&mut self` guarantees exclusive access.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.add(start), data.len());
        }
        Ok(())
    }
}

impl Drop for BackingStore {
    fn drop(&mut self) {
        if self.size == 0 {
            return;
        }
        #[cfg(unix)]
        // SAFETY: `ptr`/`size` describe the mapping created in `new`.
        unsafe {
            let _ = libc::munmap(self.ptr.cast::<libc::c_void>(), self.size);
        }
        #[cfg(not(unix))]
        // SAFETY: reconstructs the boxed slice leaked in `new`.
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                self.ptr, self.size,
            )));
        }
    }
}
