//! The exported `transform` entry point.
//!
//! A call decodes the source text, resolves the kind, applies it and encodes
//! the result under the build's [`CONTRACT`](crate::CONTRACT). Any failure
//! becomes a sentinel word, and the guest performs no writes to host-visible
//! memory on a failing call.

use crate::buffer::{GuestRegion, OwnedResult};
use std::ptr::NonNull;
use transform_core::{Result, ResultEncoding, TransformKind, apply};

/// Resolves a Convention A selector.
///
/// # Errors
///
/// Returns [`transform_core::Error::InvalidKind`] for negative or out-of-range ordinals.
pub fn resolve_ordinal(raw: i32) -> Result<TransformKind> {
    TransformKind::from_wire_ordinal(raw)
}

/// Resolves a Convention B selector.
///
/// # Errors
///
/// Returns [`transform_core::Error::InvalidPointer`] if `ptr` does not address a live region,
/// a decoding error if the name is unterminated or not UTF-8, and
/// [`transform_core::Error::InvalidKind`] if it names no kind.
///
/// # Safety
///
/// Same contract as [`GuestRegion::claim`].
pub unsafe fn resolve_name(ptr: *const u8) -> Result<TransformKind> {
    // SAFETY: forwarded to the caller.
    let region = unsafe { GuestRegion::claim(ptr.cast_mut()) }?;
    region.read_c_str("kind name")?.parse()
}

/// A raw selector argument that can be resolved to a kind.
pub trait SelectorWord: Copy {
    /// Resolves the selector.
    ///
    /// # Errors
    ///
    /// See [`resolve_ordinal`] and [`resolve_name`].
    ///
    /// # Safety
    ///
    /// Pointer selectors must satisfy [`GuestRegion::claim`].
    unsafe fn resolve(self) -> Result<TransformKind>;
}

impl SelectorWord for i32 {
    unsafe fn resolve(self) -> Result<TransformKind> {
        resolve_ordinal(self)
    }
}

impl SelectorWord for *const u8 {
    unsafe fn resolve(self) -> Result<TransformKind> {
        // SAFETY: forwarded to the caller.
        unsafe { resolve_name(self) }
    }
}

/// Selector argument type of this build.
#[cfg(not(feature = "name-selector"))]
pub type Selector = i32;

/// Selector argument type of this build.
#[cfg(feature = "name-selector")]
pub type Selector = *const u8;

/// Writes `result` over the source region as a length-prefixed string.
///
/// # Errors
///
/// Returns [`transform_core::Error::CapacityExceeded`] if the result does not fit.
pub fn transform_in_place(mut source: GuestRegion, result: &str) -> Result<NonNull<u8>> {
    source.write_length_prefixed(result.as_bytes())
}

/// Copies `result` into a new NUL-terminated buffer owned by the caller.
///
/// # Errors
///
/// Returns [`transform_core::Error::InteriorNul`] or [`transform_core::Error::AllocationFailure`].
pub fn transform_allocated(result: &str) -> Result<NonNull<u8>> {
    Ok(OwnedResult::new(result)?.into_raw())
}

/// Runs one transform against a claimed source region.
///
/// # Errors
///
/// Propagates decoding, kind resolution and encoding failures, in that order.
pub fn run(
    source: GuestRegion,
    kind: impl FnOnce() -> Result<TransformKind>,
    encoding: ResultEncoding,
) -> Result<NonNull<u8>> {
    let text = source.read_c_str("source")?;
    let kind = kind()?;
    let transformed = apply(&text, kind);

    match encoding {
        ResultEncoding::LengthPrefixed => transform_in_place(source, &transformed),
        ResultEncoding::NulTerminated => transform_allocated(&transformed),
    }
}

/// Converts an outcome into the returned word.
///
/// Errors without a sentinel cannot arise inside the guest; should one
/// appear it is reported as the reserved word 0.
#[must_use]
pub fn into_word(outcome: Result<NonNull<u8>>) -> *mut u8 {
    match outcome {
        Ok(ptr) => ptr.as_ptr(),
        Err(err) => {
            tracing::debug!("transform failed: {err}");
            let code = err.sentinel().map_or(0, |sentinel| sentinel.code());
            std::ptr::without_provenance_mut(code as usize)
        }
    }
}

/// `transform(source, selector) -> word` export.
///
/// Returns the result address on success and a sentinel word on failure.
///
/// # Safety
///
/// `source`, and under the name selector also `selector`, must either be
/// rejected by the registry or address a region handed out by `alloc` that
/// nothing else accesses during the call.
#[cfg_attr(target_family = "wasm", unsafe(no_mangle))]
pub unsafe extern "C" fn transform(source: *mut u8, selector: Selector) -> *mut u8 {
    // SAFETY: forwarded to the caller.
    let outcome = unsafe { GuestRegion::claim(source) }.and_then(|region| {
        // SAFETY: forwarded to the caller.
        run(region, || unsafe { selector.resolve() }, crate::CONTRACT.encoding)
    });
    into_word(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc;
    use transform_core::{Error, Sentinel};

    fn region_with(bytes: &[u8], capacity: usize) -> *mut u8 {
        let ptr = alloc::guest_alloc(capacity);
        // SAFETY: capacity >= bytes.len() in every test.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
        ptr
    }

    fn snapshot(ptr: *mut u8, len: usize) -> Vec<u8> {
        // SAFETY: tests only snapshot regions they allocated with len bytes.
        unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec()
    }

    fn claim(ptr: *mut u8) -> GuestRegion {
        // SAFETY: ptr came from guest_alloc and is used by one test only.
        unsafe { GuestRegion::claim(ptr) }.unwrap()
    }

    #[test]
    fn test_resolve_ordinal() {
        assert_eq!(resolve_ordinal(0).unwrap(), TransformKind::Identity);
        assert_eq!(resolve_ordinal(14).unwrap(), TransformKind::IntTypeToLongType);
        assert!(resolve_ordinal(15).unwrap_err().is_invalid_kind());
        assert!(resolve_ordinal(-1).unwrap_err().is_invalid_kind());
    }

    #[test]
    fn test_resolve_name() {
        let known = region_with(b"TrueToFalse\0", 32);
        let unknown = region_with(b"Unknown\0", 32);
        let lowercase = region_with(b"truetofalse\0", 32);

        // SAFETY: every pointer came from guest_alloc.
        unsafe {
            assert_eq!(resolve_name(known).unwrap(), TransformKind::TrueToFalse);
            assert!(resolve_name(unknown).unwrap_err().is_invalid_kind());
            assert!(resolve_name(lowercase).unwrap_err().is_invalid_kind());
            assert!(matches!(
                resolve_name(std::ptr::null()),
                Err(Error::InvalidPointer { .. })
            ));
        }

        for ptr in [known, unknown, lowercase] {
            alloc::release(ptr);
        }
    }

    #[test]
    fn test_run_in_place() {
        let ptr = region_with(b"hello\0", 64);
        let out = run(claim(ptr), || Ok(TransformKind::Identity), ResultEncoding::LengthPrefixed)
            .unwrap();
        assert_eq!(out.as_ptr(), ptr);
        assert_eq!(snapshot(ptr, 9), b"\x05\0\0\0hello");
        alloc::release(ptr);
    }

    #[test]
    fn test_run_allocated_leaves_source_untouched() {
        let ptr = region_with(b"int x;\0", 16);
        let out = run(
            claim(ptr),
            || Ok(TransformKind::IntTypeToLongType),
            ResultEncoding::NulTerminated,
        )
        .unwrap();

        assert_ne!(out.as_ptr(), ptr);
        assert_eq!(snapshot(out.as_ptr(), 8), b"long x;\0");
        assert_eq!(snapshot(ptr, 7), b"int x;\0");

        assert!(alloc::release(out.as_ptr()));
        alloc::release(ptr);
    }

    #[test]
    fn test_run_invalid_kind_writes_nothing() {
        let ptr = region_with(b"a+b\0", 16);
        let before = snapshot(ptr, 16);
        let err = run(
            claim(ptr),
            || resolve_ordinal(99),
            ResultEncoding::LengthPrefixed,
        )
        .unwrap_err();

        assert!(err.is_invalid_kind());
        assert_eq!(snapshot(ptr, 16), before);
        alloc::release(ptr);
    }

    #[test]
    fn test_run_decodes_before_resolving() {
        let ptr = region_with(&[0x80, 0], 8);
        let err = run(claim(ptr), || resolve_ordinal(99), ResultEncoding::LengthPrefixed)
            .unwrap_err();
        assert!(err.is_decoding_error());
        alloc::release(ptr);
    }

    #[test]
    fn test_into_word() {
        let ptr = region_with(b"\0", 1);
        let word = into_word(Ok(NonNull::new(ptr).unwrap()));
        assert_eq!(word, ptr);
        alloc::release(ptr);

        let word = into_word(Err(Error::InvalidKind {
            value: "Unknown".to_string(),
        }));
        assert_eq!(word.addr(), Sentinel::InvalidKind.code() as usize);

        let word = into_word(Err(Error::WasmError {
            message: "host only".to_string(),
        }));
        assert_eq!(word.addr(), 0);
    }
}
