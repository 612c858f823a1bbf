//! Host invocation adapter for the WASM text transform guest.
//!
//! Loads guest modules into a Wasmtime sandbox with memory and fuel limits,
//! reserves a heap inside each instance, and drives the `transform` export
//! under the configured [`WireContract`]:
//!
//! 1. the source text and its NUL terminator are written at the heap base
//! 2. under the name convention the kind name goes into a second region
//! 3. the returned word is classified as a sentinel or a result address
//! 4. the result is decoded strictly as UTF-8
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
//! assert_eq!(instance.transform("hello", TransformKind::Identity)?, "hello");
//! println!("{:?}", engine.collect_stats());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod cache;
pub mod config;
mod engine;
mod instance;
mod memory;
mod stats;

pub use cache::{CacheKey, ModuleCache};
pub use config::{HostConfig, HostConfigBuilder};
pub use engine::{TransformEngine, TransformModule};
pub use instance::TransformInstance;
pub use memory::HeapRegion;
pub use stats::TransformStats;
pub use transform_core::{
    Error, KindSelector, Result, ResultEncoding, Sentinel, TransformKind, WireContract,
};
