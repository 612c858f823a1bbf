//! Compiled module cache.
//!
//! Modules are keyed by the BLAKE3 hash of their bytes, so loading the same
//! guest twice reuses the first compilation.
//!
//! # Examples
//!
//! ```
//! use std::num::NonZeroUsize;
//! use transform_host::cache::ModuleCache;
//!
//! let cache = ModuleCache::new(NonZeroUsize::new(4).unwrap());
//! let key = ModuleCache::cache_key_for_code(b"\0asm");
//! assert!(!cache.contains(&key));
//! ```

use blake3::Hasher;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use wasmtime::Module;

/// Cache key derived from module bytes.
///
/// # Examples
///
/// ```
/// use transform_host::cache::CacheKey;
///
/// assert_eq!(CacheKey::new("abc"), CacheKey::new("abc"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a cache key.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short prefix for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self.0.len().min(16);
        &self.0[..end]
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// LRU cache of compiled modules.
///
/// `Send` and `Sync`; the LRU state sits behind a mutex.
pub struct ModuleCache {
    cache: Mutex<lru::LruCache<CacheKey, Module>>,
}

impl std::fmt::Debug for ModuleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl ModuleCache {
    /// Creates a cache holding at most `capacity` modules.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(lru::LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, lru::LruCache<CacheKey, Module>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Derives the cache key for module bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use transform_host::cache::ModuleCache;
    ///
    /// let key = ModuleCache::cache_key_for_code(b"module");
    /// assert!(key.as_str().starts_with("wasm_"));
    /// ```
    #[must_use]
    pub fn cache_key_for_code(code: &[u8]) -> CacheKey {
        let mut hasher = Hasher::new();
        hasher.update(code);
        CacheKey::new(format!("wasm_{}", hasher.finalize().to_hex()))
    }

    /// Returns a cached module and marks it most recently used.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Module> {
        self.lock().get(key).cloned()
    }

    /// Inserts a module, evicting the least recently used one when full.
    pub fn insert(&self, key: CacheKey, module: Module) {
        let mut cache = self.lock();
        tracing::debug!("Module cached: {} (cache size: {})", key.short(), cache.len() + 1);
        if let Some((evicted, _)) = cache.push(key, module) {
            tracing::debug!("Module evicted: {}", evicted.short());
        }
    }

    /// Returns `true` if the key is cached. Does not touch LRU order.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains(key)
    }

    /// Removes every cached module.
    pub fn clear(&self) {
        self.lock().clear();
        tracing::info!("Module cache cleared");
    }

    /// Number of cached modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached modules.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}
