//! Bounds-checked views over guest regions.

use crate::alloc;
use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use transform_core::abi::{LENGTH_PREFIX_SIZE, SENTINEL_LIMIT, encode_length_prefix};
use transform_core::{Error, Result};

/// A pointer received from the host, together with the capacity the
/// allocator registry vouches for.
#[derive(Debug)]
pub struct GuestRegion {
    start: NonNull<u8>,
    capacity: usize,
}

impl GuestRegion {
    /// Claims the region starting at `ptr`.
    ///
    /// `ptr` may point anywhere inside a live region; the capacity runs to
    /// the end of that region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPointer`] for null pointers, addresses inside
    /// the sentinel range, and addresses outside every live region.
    ///
    /// # Safety
    ///
    /// No other code may access the region while the returned value is alive.
    pub unsafe fn claim(ptr: *mut u8) -> Result<Self> {
        let address = ptr.addr();
        if address < SENTINEL_LIMIT as usize {
            return Err(Error::InvalidPointer { address });
        }
        let capacity = alloc::capacity_at(address).ok_or(Error::InvalidPointer { address })?;
        let start = NonNull::new(ptr).ok_or(Error::InvalidPointer { address })?;
        Ok(Self { start, capacity })
    }

    /// Readable and writable bytes from the start of the region.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Start of the region.
    #[must_use]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.start.as_ptr()
    }

    fn bytes(&self) -> &[u8] {
        // SAFETY: claim checked that [start, start + capacity) lies inside a
        // live zero-initialised region, and the claim contract keeps it ours.
        unsafe { std::slice::from_raw_parts(self.start.as_ptr(), self.capacity) }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as in `bytes`, with exclusive access through &mut self.
        unsafe { std::slice::from_raw_parts_mut(self.start.as_ptr(), self.capacity) }
    }

    /// Reads the NUL-terminated string at the start of the region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unterminated`] if no NUL lies within the capacity and
    /// [`Error::InvalidUtf8`] if the bytes before it are not UTF-8.
    pub fn read_c_str(&self, context: &str) -> Result<String> {
        let text = CStr::from_bytes_until_nul(self.bytes())
            .map_err(|_| Error::Unterminated {
                capacity: self.capacity,
            })?
            .to_str()
            .map_err(|source| Error::InvalidUtf8 {
                context: context.to_string(),
                source,
            })?;
        Ok(text.to_owned())
    }

    /// Overwrites the region with a little-endian `u32` length followed by
    /// `payload`, and returns the region start.
    ///
    /// Nothing is written when the payload does not fit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if `4 + payload.len()` exceeds the
    /// capacity.
    pub fn write_length_prefixed(&mut self, payload: &[u8]) -> Result<NonNull<u8>> {
        let required = payload.len().saturating_add(LENGTH_PREFIX_SIZE);
        let exceeded = || Error::CapacityExceeded {
            required,
            capacity: self.capacity,
        };
        if required > self.capacity {
            return Err(exceeded());
        }
        let len = u32::try_from(payload.len()).map_err(|_| exceeded())?;

        let bytes = self.bytes_mut();
        bytes[..LENGTH_PREFIX_SIZE].copy_from_slice(&encode_length_prefix(len));
        bytes[LENGTH_PREFIX_SIZE..required].copy_from_slice(payload);
        Ok(self.start)
    }
}

/// A NUL-terminated result buffer allocated inside the guest.
///
/// Dropping it releases the buffer; [`OwnedResult::into_raw`] hands
/// ownership to the host instead.
#[derive(Debug)]
pub struct OwnedResult {
    ptr: NonNull<u8>,
    len: usize,
}

impl OwnedResult {
    /// Copies `text` into a new buffer and appends a NUL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InteriorNul`] if `text` contains a NUL byte and
    /// [`Error::AllocationFailure`] if the buffer cannot be allocated.
    pub fn new(text: &str) -> Result<Self> {
        if let Some(position) = text.bytes().position(|b| b == 0) {
            return Err(Error::InteriorNul { position });
        }
        let size = text.len().saturating_add(1);
        let ptr = alloc::allocate(size).ok_or(Error::AllocationFailure { size })?;

        // SAFETY: the region holds size = len + 1 bytes and cannot overlap text.
        unsafe {
            std::ptr::copy_nonoverlapping(text.as_ptr(), ptr.as_ptr(), text.len());
            ptr.as_ptr().add(text.len()).write(0);
        }
        Ok(Self {
            ptr,
            len: text.len(),
        })
    }

    /// Length without the terminator.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for an empty string.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes without the terminator.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: new() initialised len + 1 bytes at ptr.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Gives up ownership. The caller must release the buffer through
    /// `dealloc` exactly once.
    #[must_use = "the buffer leaks unless it is released through dealloc"]
    pub fn into_raw(self) -> NonNull<u8> {
        ManuallyDrop::new(self).ptr
    }
}

impl Drop for OwnedResult {
    fn drop(&mut self) {
        alloc::release(self.ptr.as_ptr());
    }
}
