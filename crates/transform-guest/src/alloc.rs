//! Tracked guest allocator.
//!
//! Every region handed to the host through the `alloc` export is recorded
//! with its size. The entry point uses that registry to bounds-check the
//! pointers it receives: a pointer is only trusted if it lies inside a live
//! region, and the readable capacity runs from the pointer to the end of
//! that region.
//!
//! Regions are zero-initialised, so reading a whole region never observes
//! uninitialised memory.

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::collections::BTreeMap;
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};
use transform_core::abi::SENTINEL_LIMIT;

/// Alignment of every region.
pub const REGION_ALIGN: usize = 8;

/// Live regions keyed by start address, valued by size in bytes.
static REGIONS: Mutex<BTreeMap<usize, usize>> = Mutex::new(BTreeMap::new());

fn regions() -> MutexGuard<'static, BTreeMap<usize, usize>> {
    REGIONS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Allocates a zeroed region of at least one byte.
///
/// Returns `None` if the size cannot form a layout, the allocator fails, or
/// the address would collide with the sentinel range.
#[must_use]
pub fn allocate(size: usize) -> Option<NonNull<u8>> {
    let layout = Layout::from_size_align(size.max(1), REGION_ALIGN).ok()?;

    // SAFETY: layout has a non-zero size.
    let ptr = NonNull::new(unsafe { alloc_zeroed(layout) })?;

    let address = ptr.as_ptr().addr();
    if address < SENTINEL_LIMIT as usize {
        // SAFETY: ptr was returned by alloc_zeroed with this layout.
        unsafe { dealloc(ptr.as_ptr(), layout) };
        tracing::warn!("allocator returned {address:#x} inside the sentinel range");
        return None;
    }

    regions().insert(address, layout.size());
    Some(ptr)
}

/// Releases a region previously returned by [`allocate`].
///
/// Unknown pointers (including interior pointers and double frees) are
/// ignored and reported as `false`.
pub fn release(ptr: *mut u8) -> bool {
    let address = ptr.addr();
    let Some(size) = regions().remove(&address) else {
        return false;
    };

    // SAFETY: size and alignment formed a valid layout when the region was
    // allocated, and the registry entry proves ptr came from alloc_zeroed.
    unsafe {
        let layout = Layout::from_size_align_unchecked(size, REGION_ALIGN);
        dealloc(ptr, layout);
    }
    true
}

/// Returns the number of bytes from `address` to the end of the live region
/// containing it.
#[must_use]
pub fn capacity_at(address: usize) -> Option<usize> {
    let regions = regions();
    let (&start, &size) = regions.range(..=address).next_back()?;
    let end = start + size;
    (address < end).then(|| end - address)
}

/// Returns `true` if `ptr` is the start of a live region.
#[must_use]
pub fn is_live(ptr: *const u8) -> bool {
    regions().contains_key(&ptr.addr())
}

/// `alloc(size) -> ptr` export. Returns null on failure.
#[cfg_attr(target_family = "wasm", unsafe(export_name = "alloc"))]
pub extern "C" fn guest_alloc(size: usize) -> *mut u8 {
    allocate(size).map_or(std::ptr::null_mut(), NonNull::as_ptr)
}

/// `dealloc(ptr)` export.
#[cfg_attr(target_family = "wasm", unsafe(export_name = "dealloc"))]
pub extern "C" fn guest_dealloc(ptr: *mut u8) {
    if !release(ptr) {
        tracing::debug!("dealloc ignored unknown region {:#x}", ptr.addr());
    }
}
