//! One instantiated guest and its reserved heap.

use crate::config::HostConfig;
use crate::engine::{StoreData, refuel, runtime_error};
use crate::memory::{GuestMemory, HeapRegion};
use crate::stats::StatsRecorder;
use std::sync::Arc;
use std::time::Instant;
use transform_core::abi::{
    ALLOC_EXPORT, DEALLOC_EXPORT, LENGTH_PREFIX_SIZE, MEMORY_EXPORT, ResultWord,
    SENTINEL_LIMIT, TRANSFORM_EXPORT, decode_length_prefix,
};
use transform_core::{
    Error, KindSelector, Result, ResultEncoding, TransformKind, WireContract,
};
use wasmtime::{Instance, Store, TypedFunc};

const BOM: &str = "\u{feff}";

/// Typed handles to the guest exports.
struct Exports {
    transform: TypedFunc<(i32, i32), i32>,
    alloc: TypedFunc<i32, i32>,
    dealloc: TypedFunc<i32, ()>,
}

impl Exports {
    fn resolve(store: &mut Store<StoreData>, instance: &Instance) -> Result<Self> {
        let lookup_failed = |name: &str, e: &anyhow::Error| Error::WasmError {
            message: format!("Export '{name}' not usable: {e}"),
        };
        Ok(Self {
            transform: instance
                .get_typed_func(&mut *store, TRANSFORM_EXPORT)
                .map_err(|e| lookup_failed(TRANSFORM_EXPORT, &e))?,
            alloc: instance
                .get_typed_func(&mut *store, ALLOC_EXPORT)
                .map_err(|e| lookup_failed(ALLOC_EXPORT, &e))?,
            dealloc: instance
                .get_typed_func(&mut *store, DEALLOC_EXPORT)
                .map_err(|e| lookup_failed(DEALLOC_EXPORT, &e))?,
        })
    }
}

/// An instantiated guest with a reserved heap.
///
/// Calls are serialised by `&mut self`; create one instance per thread from
/// a shared [`TransformEngine`](crate::TransformEngine).
///
/// The heap is reserved once and reused by every call. [`close`](Self::close)
/// returns it to the guest; dropping the instance without closing simply
/// discards the whole store.
pub struct TransformInstance {
    store: Store<StoreData>,
    memory: GuestMemory,
    exports: Exports,
    heap: HeapRegion,
    selector_region: Option<HeapRegion>,
    config: HostConfig,
    stats: Arc<StatsRecorder>,
}

impl std::fmt::Debug for TransformInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformInstance")
            .field("contract", &self.config.contract())
            .field("heap", &self.heap)
            .field("selector_region", &self.selector_region)
            .finish_non_exhaustive()
    }
}

impl TransformInstance {
    pub(crate) fn new(
        mut store: Store<StoreData>,
        instance: &Instance,
        config: HostConfig,
        stats: Arc<StatsRecorder>,
    ) -> Result<Self> {
        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .map(GuestMemory::new)
            .ok_or_else(|| Error::WasmError {
                message: format!("Module has no '{MEMORY_EXPORT}' export"),
            })?;
        let exports = Exports::resolve(&mut store, instance)?;

        let mut this = Self {
            store,
            memory,
            exports,
            heap: HeapRegion::new(0, 0),
            selector_region: None,
            config,
            stats,
        };

        this.heap = this.reserve(this.config.heap_size())?;
        if this.config.contract().selector == KindSelector::Name {
            this.selector_region = Some(this.reserve(TransformKind::MAX_NAME_LEN + 1)?);
        }

        tracing::debug!(
            heap_base = this.heap.base(),
            heap_size = this.heap.size(),
            "heap reserved"
        );
        Ok(this)
    }

    /// Returns the wire contract this instance speaks.
    #[must_use]
    pub const fn contract(&self) -> WireContract {
        self.config.contract()
    }

    /// Returns the reserved heap.
    #[must_use]
    pub const fn heap(&self) -> HeapRegion {
        self.heap
    }

    /// Returns the current size of guest linear memory in bytes.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.memory.size(&self.store)
    }

    /// Transforms `text` under `kind`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `text` contains a NUL byte
    /// - [`Error::CapacityExceeded`] if `text` plus its terminator does not
    ///   fit the heap (checked before anything is written)
    /// - [`Error::Guest`] when the guest returns a sentinel
    /// - [`Error::UnknownSentinel`] or [`Error::ContractViolation`] when the
    ///   returned word breaks the contract
    /// - [`Error::InvalidUtf8`] if the result is not UTF-8
    /// - [`Error::Trap`] if the guest traps or runs out of fuel
    pub fn transform(&mut self, text: &str, kind: TransformKind) -> Result<String> {
        self.transform_bytes(text.as_bytes(), kind)
    }

    /// Transforms raw source bytes under `kind`.
    ///
    /// The bytes are passed to the guest as-is; malformed UTF-8 is reported
    /// by the guest as a decoding sentinel.
    ///
    /// # Errors
    ///
    /// Same as [`transform`](Self::transform).
    pub fn transform_bytes(&mut self, source: &[u8], kind: TransformKind) -> Result<String> {
        let start = Instant::now();
        let outcome = self.call(source, kind);
        let elapsed = start.elapsed();
        self.stats.record_call(elapsed, outcome.is_ok());

        match &outcome {
            Ok(result) => tracing::debug!(
                %kind,
                source_bytes = source.len(),
                result_bytes = result.len(),
                "transform completed in {elapsed:?}"
            ),
            Err(e) => tracing::debug!(%kind, "transform failed: {e}"),
        }
        outcome
    }

    fn call(&mut self, source: &[u8], kind: TransformKind) -> Result<String> {
        self.write_source(source)?;
        let selector = self.write_selector(kind)?;

        refuel(&mut self.store, self.config.max_fuel())?;
        let word = self
            .exports
            .transform
            .call(&mut self.store, (self.heap.base().cast_signed(), selector))
            .map_err(|e| runtime_error("call transform", &e))?;

        let bytes = self.decode_word(word.cast_unsigned())?;
        let result = String::from_utf8(bytes).map_err(|e| Error::InvalidUtf8 {
            context: "guest result".to_string(),
            source: e.utf8_error(),
        })?;

        Ok(self.restore_bom(source, result))
    }

    fn write_source(&mut self, source: &[u8]) -> Result<()> {
        if let Some(position) = source.iter().position(|&byte| byte == 0) {
            return Err(Error::InvalidArgument(format!(
                "source text contains a NUL byte at offset {position}"
            )));
        }
        let required = source.len() + 1;
        if !self.heap.fits(required) {
            return Err(Error::CapacityExceeded {
                required,
                capacity: self.heap.size(),
            });
        }

        let mut terminated = Vec::with_capacity(required);
        terminated.extend_from_slice(source);
        terminated.push(0);
        self.memory
            .write(&mut self.store, self.heap.offset(), &terminated)
    }

    fn write_selector(&mut self, kind: TransformKind) -> Result<i32> {
        match self.config.contract().selector {
            KindSelector::Ordinal => Ok(kind.ordinal().cast_signed()),
            KindSelector::Name => {
                let region = self.selector_region.ok_or_else(|| Error::ContractViolation {
                    message: "no selector region reserved for the name convention".to_string(),
                })?;
                let mut name = kind.name().as_bytes().to_vec();
                name.push(0);
                self.memory.write(&mut self.store, region.offset(), &name)?;
                Ok(region.base().cast_signed())
            }
        }
    }

    fn decode_word(&mut self, word: u32) -> Result<Vec<u8>> {
        match ResultWord::classify(word) {
            ResultWord::Sentinel(sentinel) => Err(Error::Guest(sentinel)),
            ResultWord::Reserved(code) => Err(Error::UnknownSentinel { code }),
            ResultWord::Address(address) => match self.config.contract().encoding {
                ResultEncoding::LengthPrefixed => self.read_in_place(address),
                ResultEncoding::NulTerminated => self.take_allocated(address),
            },
        }
    }

    fn read_in_place(&self, address: u32) -> Result<Vec<u8>> {
        if address != self.heap.base() {
            return Err(Error::ContractViolation {
                message: format!(
                    "in-place result at {address:#x}, expected heap base {:#x}",
                    self.heap.base()
                ),
            });
        }

        let prefix = self.memory.read_array(&self.store, self.heap.offset())?;
        let len = decode_length_prefix(prefix) as usize;
        if !self.heap.fits(LENGTH_PREFIX_SIZE.saturating_add(len)) {
            return Err(Error::ContractViolation {
                message: format!(
                    "result length {len} overruns the {}-byte heap",
                    self.heap.size()
                ),
            });
        }

        self.memory
            .read(&self.store, self.heap.offset() + LENGTH_PREFIX_SIZE, len)
    }

    fn take_allocated(&mut self, address: u32) -> Result<Vec<u8>> {
        let bytes = self.memory.read_c_str(&self.store, address as usize);
        // ownership moved to us; release even if the read failed
        let released = self.release(address);
        let bytes = bytes?;
        released?;
        Ok(bytes)
    }

    fn restore_bom(&self, source: &[u8], result: String) -> String {
        if self.config.preserve_bom()
            && source.starts_with(BOM.as_bytes())
            && !result.starts_with(BOM)
        {
            tracing::debug!("restoring byte order mark dropped by the guest");
            return format!("{BOM}{result}");
        }
        result
    }

    fn reserve(&mut self, size: usize) -> Result<HeapRegion> {
        let request = i32::try_from(size).map_err(|_| Error::AllocationFailure { size })?;

        refuel(&mut self.store, self.config.max_fuel())?;
        let base = self
            .exports
            .alloc
            .call(&mut self.store, request)
            .map_err(|e| runtime_error("call alloc", &e))?
            .cast_unsigned();

        if base < SENTINEL_LIMIT {
            return Err(Error::AllocationFailure { size });
        }
        let end = (base as usize).checked_add(size);
        if end.is_none_or(|end| end > self.memory_size()) {
            return Err(Error::ContractViolation {
                message: format!("alloc returned {base:#x}, which cannot hold {size} bytes"),
            });
        }
        Ok(HeapRegion::new(base, size))
    }

    fn release(&mut self, address: u32) -> Result<()> {
        refuel(&mut self.store, self.config.max_fuel())?;
        self.exports
            .dealloc
            .call(&mut self.store, address.cast_signed())
            .map_err(|e| runtime_error("call dealloc", &e))
    }

    /// Reads `len` bytes of guest memory at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemoryAccess`] if the range leaves linear memory.
    pub fn peek(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        self.memory.read(&self.store, offset, len)
    }

    /// Returns the reserved regions to the guest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Trap`] if the guest traps in `dealloc`.
    pub fn close(mut self) -> Result<()> {
        if let Some(region) = self.selector_region.take() {
            self.release(region.base())?;
        }
        self.release(self.heap.base())?;
        tracing::debug!("instance closed");
        Ok(())
    }
}
