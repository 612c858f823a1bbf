//! Host adapter configuration.
//!
//! # Examples
//!
//! ```
//! use transform_host::HostConfig;
//! use transform_core::{KindSelector, WireContract};
//!
//! let config = HostConfig::builder()
//!     .selector(KindSelector::Name)
//!     .heap_size(64 * 1024)
//!     .max_fuel(10_000_000)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.contract().selector, KindSelector::Name);
//! assert_eq!(config.heap_size(), 64 * 1024);
//! assert_eq!(HostConfig::default().contract(), WireContract::CANONICAL);
//! ```

use std::num::NonZeroUsize;
use transform_core::abi::LENGTH_PREFIX_SIZE;
use transform_core::{Error, KindSelector, Result, ResultEncoding, WireContract};

/// Size of one WASM page.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Configuration for a [`TransformEngine`](crate::TransformEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Wire contract the loaded guests implement
    contract: WireContract,

    /// Bytes reserved from the guest for source text and in-place results
    heap_size: usize,

    /// Cap on guest linear memory
    memory_limit_bytes: usize,

    /// Fuel granted to every guest call; `None` disables metering
    max_fuel: Option<u64>,

    /// Link WASI preview 1 imports
    enable_wasi: bool,

    /// Re-add a leading byte order mark the guest dropped
    preserve_bom: bool,

    /// Compiled modules kept in the cache
    cache_capacity: NonZeroUsize,
}

impl HostConfig {
    /// Default reserved heap: 1,000,000 bytes
    pub const DEFAULT_HEAP_SIZE: usize = 1_000_000;

    /// Default guest memory limit: 64MB
    pub const DEFAULT_MEMORY_LIMIT_MB: usize = 64;

    /// Default module cache capacity
    pub const DEFAULT_CACHE_CAPACITY: usize = 16;

    /// Smallest heap that can hold an empty in-place result
    pub const MIN_HEAP_SIZE: usize = LENGTH_PREFIX_SIZE;

    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> HostConfigBuilder {
        HostConfigBuilder::default()
    }

    /// Returns the expected wire contract.
    #[inline]
    #[must_use]
    pub const fn contract(&self) -> WireContract {
        self.contract
    }

    /// Returns the reserved heap size in bytes.
    #[inline]
    #[must_use]
    pub const fn heap_size(&self) -> usize {
        self.heap_size
    }

    /// Returns the guest memory limit in bytes.
    #[inline]
    #[must_use]
    pub const fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_bytes
    }

    /// Returns the per-call fuel budget.
    #[inline]
    #[must_use]
    pub const fn max_fuel(&self) -> Option<u64> {
        self.max_fuel
    }

    /// Returns whether WASI preview 1 is linked.
    #[inline]
    #[must_use]
    pub const fn enable_wasi(&self) -> bool {
        self.enable_wasi
    }

    /// Returns whether a dropped byte order mark is restored.
    #[inline]
    #[must_use]
    pub const fn preserve_bom(&self) -> bool {
        self.preserve_bom
    }

    /// Returns the module cache capacity.
    #[inline]
    #[must_use]
    pub const fn cache_capacity(&self) -> NonZeroUsize {
        self.cache_capacity
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            contract: WireContract::CANONICAL,
            heap_size: Self::DEFAULT_HEAP_SIZE,
            memory_limit_bytes: Self::DEFAULT_MEMORY_LIMIT_MB * 1024 * 1024,
            max_fuel: None,
            enable_wasi: false,
            preserve_bom: true,
            cache_capacity: NonZeroUsize::MIN.saturating_add(Self::DEFAULT_CACHE_CAPACITY - 1),
        }
    }
}

/// Builder for [`HostConfig`].
///
/// Unset fields take the [`HostConfig`] defaults. [`build`](Self::build)
/// validates the combination.
#[derive(Debug, Default)]
pub struct HostConfigBuilder {
    selector: Option<KindSelector>,
    encoding: Option<ResultEncoding>,
    heap_size: Option<usize>,
    memory_limit_mb: Option<usize>,
    max_fuel: Option<Option<u64>>,
    enable_wasi: Option<bool>,
    preserve_bom: Option<bool>,
    cache_capacity: Option<usize>,
}

impl HostConfigBuilder {
    /// Sets both halves of the wire contract.
    #[must_use]
    pub const fn contract(mut self, contract: WireContract) -> Self {
        self.selector = Some(contract.selector);
        self.encoding = Some(contract.encoding);
        self
    }

    /// Sets the kind selector convention.
    #[must_use]
    pub const fn selector(mut self, selector: KindSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Sets the result encoding.
    #[must_use]
    pub const fn encoding(mut self, encoding: ResultEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Sets the reserved heap size in bytes.
    #[must_use]
    pub const fn heap_size(mut self, bytes: usize) -> Self {
        self.heap_size = Some(bytes);
        self
    }

    /// Sets the guest memory limit in megabytes.
    #[must_use]
    pub const fn memory_limit_mb(mut self, mb: usize) -> Self {
        self.memory_limit_mb = Some(mb);
        self
    }

    /// Enables fuel metering with a per-call budget.
    #[must_use]
    pub const fn max_fuel(mut self, fuel: u64) -> Self {
        self.max_fuel = Some(Some(fuel));
        self
    }

    /// Disables fuel metering.
    #[must_use]
    pub const fn unlimited_fuel(mut self) -> Self {
        self.max_fuel = Some(None);
        self
    }

    /// Links WASI preview 1 imports for `wasm32-wasip1` guests.
    #[must_use]
    pub const fn enable_wasi(mut self, enable: bool) -> Self {
        self.enable_wasi = Some(enable);
        self
    }

    /// Sets whether a dropped byte order mark is restored.
    #[must_use]
    pub const fn preserve_bom(mut self, preserve: bool) -> Self {
        self.preserve_bom = Some(preserve);
        self
    }

    /// Sets the module cache capacity.
    #[must_use]
    pub const fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if:
    /// - the heap is smaller than [`HostConfig::MIN_HEAP_SIZE`] or larger
    ///   than `i32::MAX`, the largest size `alloc` can be asked for
    /// - the memory limit is below one page or not larger than the heap
    /// - the fuel budget or cache capacity is zero
    pub fn build(self) -> Result<HostConfig> {
        let defaults = HostConfig::default();

        let heap_size = self.heap_size.unwrap_or(defaults.heap_size);
        if heap_size < HostConfig::MIN_HEAP_SIZE || i32::try_from(heap_size).is_err() {
            return Err(config_error(format!(
                "heap size must be between {} and {} bytes, got {heap_size}",
                HostConfig::MIN_HEAP_SIZE,
                i32::MAX
            )));
        }

        let memory_limit_bytes = match self.memory_limit_mb {
            Some(mb) => mb
                .checked_mul(1024 * 1024)
                .ok_or_else(|| config_error(format!("memory limit of {mb}MB overflows")))?,
            None => defaults.memory_limit_bytes,
        };
        if memory_limit_bytes < WASM_PAGE_SIZE {
            return Err(config_error(format!(
                "memory limit must be at least one page ({WASM_PAGE_SIZE} bytes)"
            )));
        }
        if heap_size >= memory_limit_bytes {
            return Err(config_error(format!(
                "heap size {heap_size} must be below the memory limit {memory_limit_bytes}"
            )));
        }

        let max_fuel = self.max_fuel.unwrap_or(defaults.max_fuel);
        if max_fuel == Some(0) {
            return Err(config_error("fuel budget must be positive".to_string()));
        }

        let cache_capacity = match self.cache_capacity {
            Some(capacity) => NonZeroUsize::new(capacity)
                .ok_or_else(|| config_error("cache capacity must be positive".to_string()))?,
            None => defaults.cache_capacity,
        };

        Ok(HostConfig {
            contract: WireContract::new(
                self.selector.unwrap_or(defaults.contract.selector),
                self.encoding.unwrap_or(defaults.contract.encoding),
            ),
            heap_size,
            memory_limit_bytes,
            max_fuel,
            enable_wasi: self.enable_wasi.unwrap_or(defaults.enable_wasi),
            preserve_bom: self.preserve_bom.unwrap_or(defaults.preserve_bom),
            cache_capacity,
        })
    }
}

const fn config_error(message: String) -> Error {
    Error::ConfigError { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.contract(), WireContract::CANONICAL);
        assert_eq!(config.heap_size(), 1_000_000);
        assert_eq!(config.memory_limit_bytes(), 64 * 1024 * 1024);
        assert_eq!(config.max_fuel(), None);
        assert!(!config.enable_wasi());
        assert!(config.preserve_bom());
        assert_eq!(config.cache_capacity().get(), 16);
    }

    #[test]
    fn test_empty_builder_matches_default() {
        assert_eq!(HostConfig::builder().build().unwrap(), HostConfig::default());
    }

    #[test]
    fn test_builder() {
        let config = HostConfig::builder()
            .contract(WireContract::new(
                KindSelector::Name,
                ResultEncoding::NulTerminated,
            ))
            .heap_size(4096)
            .memory_limit_mb(2)
            .max_fuel(5_000)
            .enable_wasi(true)
            .preserve_bom(false)
            .cache_capacity(3)
            .build()
            .unwrap();

        assert_eq!(config.contract().selector, KindSelector::Name);
        assert_eq!(config.contract().encoding, ResultEncoding::NulTerminated);
        assert_eq!(config.heap_size(), 4096);
        assert_eq!(config.memory_limit_bytes(), 2 * 1024 * 1024);
        assert_eq!(config.max_fuel(), Some(5_000));
        assert!(config.enable_wasi());
        assert!(!config.preserve_bom());
        assert_eq!(config.cache_capacity().get(), 3);
    }

    #[test]
    fn test_unlimited_fuel_overrides() {
        let config = HostConfig::builder()
            .max_fuel(10)
            .unlimited_fuel()
            .build()
            .unwrap();
        assert_eq!(config.max_fuel(), None);
    }

    #[test]
    fn test_invalid_heap_sizes() {
        for heap in [0, 3] {
            let err = HostConfig::builder().heap_size(heap).build().unwrap_err();
            assert!(err.is_config_error());
        }
        let err = HostConfig::builder()
            .heap_size(2 * 1024 * 1024)
            .memory_limit_mb(1)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("below the memory limit"));
    }

    #[test]
    fn test_heap_size_limited_to_alloc_argument() {
        let largest = usize::try_from(i32::MAX).unwrap();
        let builder = || HostConfig::builder().memory_limit_mb(4096);

        let config = builder().heap_size(largest).build().unwrap();
        assert_eq!(config.heap_size(), largest);

        let err = builder().heap_size(largest + 1).build().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("2147483647"));
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(HostConfig::builder().memory_limit_mb(0).build().is_err());
        assert!(HostConfig::builder().max_fuel(0).build().is_err());
        assert!(HostConfig::builder().cache_capacity(0).build().is_err());
    }
}
