//! Wire contract between the host and the transform guest.
//!
//! The guest exports a single `transform(source_ptr, selector)` function
//! returning one pointer-sized word. How `selector` is read and how the
//! returned word is interpreted is fixed per module build by a
//! [`WireContract`]; both sides learn it out of band, never at runtime.
//!
//! # Result word
//!
//! Words below [`SENTINEL_LIMIT`] are [`Sentinel`] codes, never addresses.
//! Any other word is the address of the result buffer:
//!
//! | Encoding                          | Layout at the address                 |
//! |-----------------------------------|---------------------------------------|
//! | [`ResultEncoding::LengthPrefixed`]| `u32` little-endian length, then bytes |
//! | [`ResultEncoding::NulTerminated`] | bytes, then a single `0x00`           |
//!
//! # Examples
//!
//! ```
//! use transform_core::abi::{ResultWord, Sentinel, WireContract};
//!
//! assert_eq!(WireContract::default(), WireContract::CANONICAL);
//! assert_eq!(ResultWord::classify(3), ResultWord::Sentinel(Sentinel::InvalidKind));
//! assert_eq!(ResultWord::classify(1024), ResultWord::Address(1024));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the exported transform function.
pub const TRANSFORM_EXPORT: &str = "transform";

/// Name of the exported allocator function: `alloc(size) -> ptr`.
pub const ALLOC_EXPORT: &str = "alloc";

/// Name of the exported release function: `dealloc(ptr)`.
pub const DEALLOC_EXPORT: &str = "dealloc";

/// Name of the exported linear memory.
pub const MEMORY_EXPORT: &str = "memory";

/// Result words below this value are sentinel codes.
pub const SENTINEL_LIMIT: u32 = 16;

/// Size of the length prefix of an in-place result.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Error codes returned in place of a result address.
///
/// The discriminants are the wire values and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Sentinel {
    /// Source or name pointer is null, in the sentinel range, or not inside
    /// a live guest region.
    InvalidPointer = 1,
    /// Malformed UTF-8, missing terminator, or a result that cannot be
    /// NUL-terminated.
    Decoding = 2,
    /// Ordinal out of range or name not matching any kind.
    InvalidKind = 3,
    /// In-place result does not fit the reserved region.
    CapacityExceeded = 4,
    /// Guest could not allocate the result buffer.
    AllocationFailure = 5,
}

impl Sentinel {
    /// All sentinels in code order.
    pub const ALL: [Self; 5] = [
        Self::InvalidPointer,
        Self::Decoding,
        Self::InvalidKind,
        Self::CapacityExceeded,
        Self::AllocationFailure,
    ];

    /// Returns the wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Looks up a sentinel by wire code.
    ///
    /// # Examples
    ///
    /// ```
    /// use transform_core::abi::Sentinel;
    ///
    /// assert_eq!(Sentinel::from_code(4), Some(Sentinel::CapacityExceeded));
    /// assert_eq!(Sentinel::from_code(0), None);
    /// assert_eq!(Sentinel::from_code(15), None);
    /// ```
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::InvalidPointer),
            2 => Some(Self::Decoding),
            3 => Some(Self::InvalidKind),
            4 => Some(Self::CapacityExceeded),
            5 => Some(Self::AllocationFailure),
            _ => None,
        }
    }

    /// Returns a short description.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPointer => "invalid pointer",
            Self::Decoding => "decoding failed",
            Self::InvalidKind => "invalid transform kind",
            Self::CapacityExceeded => "capacity exceeded",
            Self::AllocationFailure => "allocation failed",
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.as_str(), self.code())
    }
}

/// Classification of a word returned by `transform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultWord {
    /// A known error code.
    Sentinel(Sentinel),
    /// A word inside the sentinel range without an assigned meaning.
    Reserved(u32),
    /// Address of the result buffer.
    Address(u32),
}

impl ResultWord {
    /// Classifies a raw return word.
    #[must_use]
    pub const fn classify(word: u32) -> Self {
        if word >= SENTINEL_LIMIT {
            return Self::Address(word);
        }
        match Sentinel::from_code(word) {
            Some(sentinel) => Self::Sentinel(sentinel),
            None => Self::Reserved(word),
        }
    }
}

/// How the guest reads the transform kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KindSelector {
    /// Convention A: the selector is the kind ordinal.
    #[default]
    Ordinal,
    /// Convention B: the selector points to a NUL-terminated kind name.
    Name,
}

/// How the guest hands back the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultEncoding {
    /// Length prefix plus bytes, written over the source's reserved region.
    /// The host keeps ownership of the region.
    #[default]
    LengthPrefixed,
    /// Freshly allocated NUL-terminated buffer. Ownership moves to the host,
    /// which must release it through `dealloc` exactly once.
    NulTerminated,
}

/// The calling convention a module build implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WireContract {
    /// Kind selector convention
    pub selector: KindSelector,
    /// Result encoding convention
    pub encoding: ResultEncoding,
}

impl WireContract {
    /// Ordinal selector with an in-place length-prefixed result.
    pub const CANONICAL: Self = Self {
        selector: KindSelector::Ordinal,
        encoding: ResultEncoding::LengthPrefixed,
    };

    /// Creates a contract from its two conventions.
    #[must_use]
    pub const fn new(selector: KindSelector, encoding: ResultEncoding) -> Self {
        Self { selector, encoding }
    }
}

impl fmt::Display for WireContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selector = match self.selector {
            KindSelector::Ordinal => "ordinal",
            KindSelector::Name => "name",
        };
        let encoding = match self.encoding {
            ResultEncoding::LengthPrefixed => "length-prefixed",
            ResultEncoding::NulTerminated => "nul-terminated",
        };
        write!(f, "{selector}/{encoding}")
    }
}

/// Encodes a length prefix.
#[inline]
#[must_use]
pub const fn encode_length_prefix(len: u32) -> [u8; LENGTH_PREFIX_SIZE] {
    len.to_le_bytes()
}

/// Decodes a length prefix.
#[inline]
#[must_use]
pub const fn decode_length_prefix(bytes: [u8; LENGTH_PREFIX_SIZE]) -> u32 {
    u32::from_le_bytes(bytes)
}
