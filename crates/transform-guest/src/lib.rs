//! Transform guest module.
//!
//! Built for `wasm32-unknown-unknown` this crate is the sandboxed module the
//! host loads. It exports:
//!
//! - `memory`: the guest linear memory
//! - `alloc(size) -> ptr` / `dealloc(ptr)`: tracked region allocator
//! - `transform(source, selector) -> word`: the transform entry point
//!
//! The calling convention is fixed per build by cargo features:
//!
//! | Features           | Selector          | Result                         |
//! |--------------------|-------------------|--------------------------------|
//! | (none)             | kind ordinal      | length-prefixed, in place      |
//! | `name-selector`    | pointer to name   | length-prefixed, in place      |
//! | `allocated-result` | kind ordinal      | new NUL-terminated buffer      |
//!
//! Both features may be combined. Natively the exports keep their Rust
//! names so the ABI can be exercised in ordinary tests.
//!
//! # Examples
//!
//! ```
//! use transform_guest::CONTRACT;
//! use transform_core::WireContract;
//!
//! # #[cfg(not(any(feature = "name-selector", feature = "allocated-result")))]
//! assert_eq!(CONTRACT, WireContract::CANONICAL);
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod alloc;
pub mod buffer;
pub mod entry;

use transform_core::{KindSelector, ResultEncoding, WireContract};

/// Calling convention implemented by this build.
pub const CONTRACT: WireContract = WireContract::new(
    if cfg!(feature = "name-selector") {
        KindSelector::Name
    } else {
        KindSelector::Ordinal
    },
    if cfg!(feature = "allocated-result") {
        ResultEncoding::NulTerminated
    } else {
        ResultEncoding::LengthPrefixed
    },
);

pub use entry::transform;
