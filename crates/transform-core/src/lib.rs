//! Core types for the WASM text-transform boundary.
//!
//! This crate is shared by the sandboxed guest and the host adapter, so
//! both sides agree on the same definitions.
//!
//! # Architecture
//!
//! - [`TransformKind`]: the closed enumeration with stable ordinals and names
//! - [`abi`]: export names, sentinel codes and the [`WireContract`]
//! - [`Error`]: one error hierarchy for both sides of the boundary
//! - [`apply`]: the reference transform collaborator

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod abi;
mod error;
mod kind;
mod rewrite;

pub use abi::{KindSelector, ResultEncoding, Sentinel, WireContract};
pub use error::{Error, Result};
pub use kind::TransformKind;
pub use rewrite::apply;
