//! Error types for the WASM transform boundary.
//!
//! One error enum serves both sides of the boundary. Guest-side variants
//! carry enough detail for logging inside the module and collapse to a
//! [`Sentinel`] when they cross back to the host; host-side variants
//! describe what the adapter observed around the call.
//!
//! # Examples
//!
//! ```
//! use transform_core::{Error, Result, Sentinel};
//!
//! fn resolve(ordinal: i32) -> Result<()> {
//!     if ordinal < 0 {
//!         return Err(Error::InvalidKind {
//!             value: ordinal.to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = resolve(-1).unwrap_err();
//! assert!(err.is_invalid_kind());
//! assert_eq!(err.sentinel(), Some(Sentinel::InvalidKind));
//! ```

use crate::abi::Sentinel;
use thiserror::Error;

/// Main error type for the transform boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// Pointer does not address a live guest region.
    ///
    /// Raised by the guest for null pointers, addresses inside the sentinel
    /// range, and addresses that no `alloc` call handed out.
    #[error("Invalid guest pointer: {address:#x}")]
    InvalidPointer {
        /// The offending address
        address: usize,
    },

    /// Bytes are not well-formed UTF-8.
    #[error("Invalid UTF-8 in {context}")]
    InvalidUtf8 {
        /// Which buffer failed to decode (source, kind name, result)
        context: String,
        /// Underlying decoding error
        #[source]
        source: std::str::Utf8Error,
    },

    /// No NUL terminator inside the readable capacity.
    #[error("No NUL terminator within {capacity} readable bytes")]
    Unterminated {
        /// Bytes scanned before giving up
        capacity: usize,
    },

    /// Text contains a NUL byte and cannot be NUL-terminated.
    #[error("Interior NUL byte at offset {position}")]
    InteriorNul {
        /// Byte offset of the first NUL
        position: usize,
    },

    /// Wire value does not name a transform kind.
    ///
    /// Unknown ordinals and names are always rejected; there is no default
    /// kind to fall back to.
    #[error("Invalid transform kind: {value}")]
    InvalidKind {
        /// The ordinal or name as received
        value: String,
    },

    /// Data does not fit the reserved region.
    #[error("Capacity exceeded: {required} bytes required, {capacity} available")]
    CapacityExceeded {
        /// Bytes the encoding needs
        required: usize,
        /// Bytes the region provides
        capacity: usize,
    },

    /// Guest allocator could not provide memory.
    #[error("Allocation of {size} bytes failed")]
    AllocationFailure {
        /// Requested size in bytes
        size: usize,
    },

    /// Guest returned a sentinel code.
    ///
    /// The call produced no result. A sentinel is never an empty string.
    #[error("Guest reported failure: {0}")]
    Guest(Sentinel),

    /// Guest returned a word inside the sentinel range with no assigned meaning.
    #[error("Guest returned unknown sentinel code {code}")]
    UnknownSentinel {
        /// The raw return word
        code: u32,
    },

    /// Guest returned a word that breaks the wire contract.
    #[error("Wire contract violation: {message}")]
    ContractViolation {
        /// Description of the violation
        message: String,
    },

    /// Host access outside guest linear memory.
    #[error("Guest memory access out of bounds: offset {offset}, length {len}")]
    MemoryAccess {
        /// Start offset of the access
        offset: usize,
        /// Length of the access
        len: usize,
    },

    /// Module compilation, linking or instantiation failed.
    #[error("WASM error: {message}")]
    WasmError {
        /// Description of the failure
        message: String,
    },

    /// Guest execution trapped.
    #[error("Guest trapped: {message}")]
    Trap {
        /// Trap description reported by the runtime
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// Caller input rejected before crossing the boundary.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Returns the sentinel this error is reported as when it crosses the
    /// boundary from guest to host.
    ///
    /// Host-only variants have no sentinel and return `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use transform_core::{Error, Sentinel};
    ///
    /// let err = Error::CapacityExceeded { required: 12, capacity: 8 };
    /// assert_eq!(err.sentinel(), Some(Sentinel::CapacityExceeded));
    ///
    /// let err = Error::WasmError { message: "bad module".to_string() };
    /// assert_eq!(err.sentinel(), None);
    /// ```
    #[must_use]
    pub const fn sentinel(&self) -> Option<Sentinel> {
        match self {
            Self::InvalidPointer { .. } => Some(Sentinel::InvalidPointer),
            Self::InvalidUtf8 { .. } | Self::Unterminated { .. } | Self::InteriorNul { .. } => {
                Some(Sentinel::Decoding)
            }
            Self::InvalidKind { .. } => Some(Sentinel::InvalidKind),
            Self::CapacityExceeded { .. } => Some(Sentinel::CapacityExceeded),
            Self::AllocationFailure { .. } => Some(Sentinel::AllocationFailure),
            Self::Guest(sentinel) => Some(*sentinel),
            _ => None,
        }
    }

    /// Returns `true` if this error means the kind selector was not recognised,
    /// whether detected locally or reported by the guest.
    #[must_use]
    pub const fn is_invalid_kind(&self) -> bool {
        matches!(
            self,
            Self::InvalidKind { .. } | Self::Guest(Sentinel::InvalidKind)
        )
    }

    /// Returns `true` for decoding failures on either side of the boundary.
    ///
    /// # Examples
    ///
    /// ```
    /// use transform_core::{Error, Sentinel};
    ///
    /// assert!(Error::Unterminated { capacity: 4 }.is_decoding_error());
    /// assert!(Error::Guest(Sentinel::Decoding).is_decoding_error());
    /// ```
    #[must_use]
    pub const fn is_decoding_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUtf8 { .. }
                | Self::Unterminated { .. }
                | Self::InteriorNul { .. }
                | Self::Guest(Sentinel::Decoding)
        )
    }

    /// Returns `true` if the data did not fit its region.
    #[must_use]
    pub const fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::Guest(Sentinel::CapacityExceeded)
        )
    }

    /// Returns `true` if the guest trapped.
    #[must_use]
    pub const fn is_trap(&self) -> bool {
        matches!(self, Self::Trap { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }
}

/// Result type alias for transform operations.
pub type Result<T> = std::result::Result<T, Error>;
