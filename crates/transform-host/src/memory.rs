//! Bounds-checked access to guest linear memory.

use crate::engine::StoreData;
use serde::Serialize;
use transform_core::{Error, Result};
use wasmtime::{Memory, Store};

/// A region the host reserved through the guest's `alloc` export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeapRegion {
    base: u32,
    size: usize,
}

impl HeapRegion {
    pub(crate) const fn new(base: u32, size: usize) -> Self {
        Self { base, size }
    }

    /// Guest address of the first byte.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Guest address of the first byte, as a memory offset.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.base as usize
    }

    /// Size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` if `len` bytes starting at the base stay inside the region.
    #[must_use]
    pub const fn fits(&self, len: usize) -> bool {
        len <= self.size
    }
}

/// Exported memory of one instance.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GuestMemory(Memory);

impl GuestMemory {
    pub(crate) const fn new(memory: Memory) -> Self {
        Self(memory)
    }

    pub(crate) fn size(self, store: &Store<StoreData>) -> usize {
        self.0.data_size(store)
    }

    pub(crate) fn read(self, store: &Store<StoreData>, offset: usize, len: usize) -> Result<Vec<u8>> {
        let data = self.0.data(store);
        offset
            .checked_add(len)
            .and_then(|end| data.get(offset..end))
            .map(<[u8]>::to_vec)
            .ok_or(Error::MemoryAccess { offset, len })
    }

    pub(crate) fn read_array<const N: usize>(
        self,
        store: &Store<StoreData>,
        offset: usize,
    ) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.0
            .read(store, offset, &mut buf)
            .map_err(|_| Error::MemoryAccess { offset, len: N })?;
        Ok(buf)
    }

    pub(crate) fn write(self, store: &mut Store<StoreData>, offset: usize, bytes: &[u8]) -> Result<()> {
        self.0
            .write(store, offset, bytes)
            .map_err(|_| Error::MemoryAccess {
                offset,
                len: bytes.len(),
            })
    }

    /// Reads bytes from `offset` up to the next NUL, which must lie inside
    /// linear memory.
    pub(crate) fn read_c_str(self, store: &Store<StoreData>, offset: usize) -> Result<Vec<u8>> {
        let tail = self
            .0
            .data(store)
            .get(offset..)
            .ok_or(Error::MemoryAccess { offset, len: 0 })?;
        let len = tail
            .iter()
            .position(|&byte| byte == 0)
            .ok_or(Error::Unterminated {
                capacity: tail.len(),
            })?;
        Ok(tail[..len].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_region_bounds() {
        let region = HeapRegion::new(1024, 16);
        assert_eq!(region.base(), 1024);
        assert_eq!(region.offset(), 1024);
        assert!(region.fits(16));
        assert!(!region.fits(17));
    }
}
