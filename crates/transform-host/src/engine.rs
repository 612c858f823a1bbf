//! Wasmtime engine, module loading and instantiation.
//!
//! # Examples
//!
//! ```no_run
//! use transform_host::{HostConfig, TransformEngine};
//! use transform_core::TransformKind;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = TransformEngine::new(HostConfig::default())?;
//! let module = engine.load_file("transform_guest.wasm")?;
//! let mut instance = engine.instantiate(&module)?;
//!
//! let text = instance.transform("bool ok = true;", TransformKind::TrueToFalse)?;
//! assert_eq!(text, "bool ok = false;");
//! instance.close()?;
//! # Ok(())
//! # }
//! ```

use crate::cache::{CacheKey, ModuleCache};
use crate::config::HostConfig;
use crate::instance::TransformInstance;
use crate::stats::{StatsRecorder, TransformStats};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use transform_core::abi::{ALLOC_EXPORT, DEALLOC_EXPORT, MEMORY_EXPORT, TRANSFORM_EXPORT};
use transform_core::{Error, Result};
use wasmtime::{Config, Engine, ExternType, FuncType, Linker, Module, ResourceLimiter, Store, Trap, ValType};
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::p1::WasiP1Ctx;

/// Per-store state.
pub(crate) struct StoreData {
    limiter: MemoryLimiter,
    /// Present only when WASI preview 1 is linked.
    wasi: Option<WasiP1Ctx>,
}

/// Compiled, export-verified guest module.
///
/// Cheap to clone; clones share the compiled code.
#[derive(Debug, Clone)]
pub struct TransformModule {
    module: Module,
    key: CacheKey,
}

impl TransformModule {
    /// Cache key of the module bytes.
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }
}

/// Shared entry point of the host adapter.
///
/// Owns the Wasmtime engine, the compiled module cache and the statistics.
/// `Send + Sync`: share it across threads and create one
/// [`TransformInstance`] per thread.
pub struct TransformEngine {
    engine: Engine,
    config: HostConfig,
    module_cache: ModuleCache,
    stats: Arc<StatsRecorder>,
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("config", &self.config)
            .field("module_cache", &self.module_cache)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

impl TransformEngine {
    /// Creates an engine for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WasmError`] if Wasmtime rejects the engine settings.
    pub fn new(config: HostConfig) -> Result<Self> {
        let mut wasmtime_config = Config::new();
        wasmtime_config.strategy(wasmtime::Strategy::Cranelift);
        if config.max_fuel().is_some() {
            wasmtime_config.consume_fuel(true);
        }

        let engine = Engine::new(&wasmtime_config).map_err(|e| Error::WasmError {
            message: format!("Failed to create Wasmtime engine: {e}"),
        })?;

        tracing::debug!(contract = %config.contract(), "transform engine created");

        Ok(Self {
            engine,
            module_cache: ModuleCache::new(config.cache_capacity()),
            config,
            stats: Arc::new(StatsRecorder::default()),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Compiles `wasm_bytes`, or fetches the compiled module from the cache,
    /// and verifies its exports.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WasmError`] if the bytes do not compile or the module
    /// lacks one of the `memory`, `alloc`, `dealloc` and `transform` exports
    /// with the expected types.
    pub fn load(&self, wasm_bytes: &[u8]) -> Result<TransformModule> {
        let key = ModuleCache::cache_key_for_code(wasm_bytes);

        if let Some(module) = self.module_cache.get(&key) {
            self.stats.record_cache_hit();
            tracing::debug!("Using cached WASM module: {}", key.short());
            return Ok(TransformModule { module, key });
        }

        self.stats.record_cache_miss();
        tracing::debug!("Compiling WASM module ({} bytes)", wasm_bytes.len());
        let compilation_start = Instant::now();

        let module = Module::new(&self.engine, wasm_bytes)
            .map_err(|e| Error::WasmError {
                message: format!("Failed to compile WASM module: {e}"),
            })
            .and_then(|module| verify_exports(&module).map(|()| module))
            .inspect_err(|_| self.stats.record_compilation_failure())?;

        tracing::info!("Module compiled in {:?}", compilation_start.elapsed());
        self.module_cache.insert(key.clone(), module.clone());

        Ok(TransformModule { module, key })
    }

    /// Reads and loads a module file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WasmError`] if the file cannot be read, plus the
    /// errors of [`load`](Self::load).
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<TransformModule> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::WasmError {
            message: format!("Failed to read module {}: {e}", path.display()),
        })?;
        self.load(&bytes)
    }

    /// Instantiates a module and reserves its heap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WasmError`] if linking or instantiation fails (for
    /// example when the memory limit is too small), [`Error::Trap`] if the
    /// guest traps while starting, and [`Error::AllocationFailure`] if the
    /// guest cannot reserve the heap.
    pub fn instantiate(&self, module: &TransformModule) -> Result<TransformInstance> {
        let mut store = Store::new(&self.engine, self.store_data());
        store.limiter(|data| &mut data.limiter);
        refuel(&mut store, self.config.max_fuel())?;

        let mut linker = Linker::new(&self.engine);
        if self.config.enable_wasi() {
            wasmtime_wasi::p1::add_to_linker_sync(&mut linker, |data: &mut StoreData| {
                data.wasi.get_or_insert_with(|| WasiCtxBuilder::new().build_p1())
            })
            .map_err(|e| Error::WasmError {
                message: format!("Failed to link WASI: {e}"),
            })?;
        }

        let instance = linker
            .instantiate(&mut store, &module.module)
            .map_err(|e| runtime_error("instantiate WASM module", &e))?;
        tracing::info!("Module {} instantiated", module.key.short());

        TransformInstance::new(store, &instance, self.config.clone(), Arc::clone(&self.stats))
    }

    fn store_data(&self) -> StoreData {
        StoreData {
            limiter: MemoryLimiter {
                max_memory_bytes: self.config.memory_limit_bytes(),
            },
            wasi: self
                .config
                .enable_wasi()
                .then(|| WasiCtxBuilder::new().build_p1()),
        }
    }

    /// Returns the module cache.
    #[must_use]
    pub const fn module_cache(&self) -> &ModuleCache {
        &self.module_cache
    }

    /// Clears the module cache.
    pub fn clear_cache(&self) {
        self.module_cache.clear();
    }

    /// Collects current statistics.
    ///
    /// Reads atomic counters only; safe to call from any thread.
    #[must_use]
    pub fn collect_stats(&self) -> TransformStats {
        self.stats.snapshot()
    }
}

fn is_i32_signature(ty: &FuncType, params: usize, results: usize) -> bool {
    ty.params().len() == params
        && ty.results().len() == results
        && ty.params().chain(ty.results()).all(|ty| matches!(ty, ValType::I32))
}

fn verify_exports(module: &Module) -> Result<()> {
    let missing = |name: &str, expected: &str| Error::WasmError {
        message: format!("Module must export `{name}` as {expected}"),
    };

    if !matches!(module.get_export(MEMORY_EXPORT), Some(ExternType::Memory(_))) {
        return Err(missing(MEMORY_EXPORT, "a memory"));
    }

    for (name, params, results, expected) in [
        (ALLOC_EXPORT, 1, 1, "(i32) -> i32"),
        (DEALLOC_EXPORT, 1, 0, "(i32) -> ()"),
        (TRANSFORM_EXPORT, 2, 1, "(i32, i32) -> i32"),
    ] {
        match module.get_export(name) {
            Some(ExternType::Func(ty)) if is_i32_signature(&ty, params, results) => {}
            _ => return Err(missing(name, expected)),
        }
    }

    Ok(())
}

/// Grants the per-call fuel budget when metering is enabled.
pub(crate) fn refuel(store: &mut Store<StoreData>, max_fuel: Option<u64>) -> Result<()> {
    if let Some(fuel) = max_fuel {
        store.set_fuel(fuel).map_err(|e| Error::WasmError {
            message: format!("Failed to set fuel: {e}"),
        })?;
    }
    Ok(())
}

/// Maps a Wasmtime error to a trap or a generic runtime error.
pub(crate) fn runtime_error(operation: &str, err: &anyhow::Error) -> Error {
    if let Some(trap) = err.downcast_ref::<Trap>() {
        tracing::warn!("Guest trapped during {operation}: {trap}");
        return Error::Trap {
            message: trap.to_string(),
        };
    }
    Error::WasmError {
        message: format!("Failed to {operation}: {err:#}"),
    }
}

/// Memory limiter for the guest store.
struct MemoryLimiter {
    max_memory_bytes: usize,
}

impl ResourceLimiter for MemoryLimiter {
    fn memory_growing(
        &mut self,
        current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        if desired > self.max_memory_bytes {
            tracing::warn!(
                "Memory limit exceeded: {} > {}",
                desired,
                self.max_memory_bytes
            );
            Ok(false)
        } else {
            tracing::trace!("Memory growing: {} -> {} bytes", current, desired);
            Ok(true)
        }
    }

    fn table_growing(
        &mut self,
        _current: usize,
        _desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        Ok(true)
    }
}
