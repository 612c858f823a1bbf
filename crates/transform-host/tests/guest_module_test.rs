//! Drives the compiled `transform-guest` crate through the host.
//!
//! NOTE: These tests are ignored by default because they need the guest built
//! for wasm32 first:
//!
//! ```bash
//! cargo build -p transform-guest --target wasm32-unknown-unknown --release
//! cargo test -p transform-host --test guest_module_test -- --ignored
//! ```
//!
//! `TRANSFORM_GUEST_WASM` overrides the module path.

use std::path::PathBuf;
use transform_host::{
    Error, HostConfig, Sentinel, TransformEngine, TransformInstance, TransformKind,
};

fn guest_path() -> PathBuf {
    std::env::var_os("TRANSFORM_GUEST_WASM").map_or_else(
        || {
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("../../target/wasm32-unknown-unknown/release/transform_guest.wasm")
        },
        PathBuf::from,
    )
}

fn instantiate(config: HostConfig) -> (TransformEngine, TransformInstance) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("transform_host=debug")
        .with_test_writer()
        .try_init();

    let path = guest_path();
    let engine = TransformEngine::new(config).expect("Failed to create engine");
    let module = engine
        .load_file(&path)
        .unwrap_or_else(|e| panic!("build the guest for wasm32 first ({}): {e}", path.display()));
    let instance = engine.instantiate(&module).expect("Failed to instantiate");
    (engine, instance)
}

#[test]
#[ignore]
fn test_guest_identity_hello() {
    let (_engine, mut instance) = instantiate(HostConfig::default());

    let result = instance.transform("hello", TransformKind::Identity).unwrap();

    assert_eq!(result, "hello");
}

#[test]
#[ignore]
fn test_guest_matches_reference_and_is_idempotent() {
    let (_engine, mut instance) = instantiate(HostConfig::default());
    let source = "class Counter { int count; bool on = true; void Tick() { count++; count += 2; } }";

    for kind in TransformKind::ALL {
        let once = instance.transform(source, kind).unwrap();
        assert_eq!(once, transform_core::apply(source, kind), "{kind}");

        let twice = instance.transform(&once, kind).unwrap();
        assert_eq!(once, twice, "{kind} is not idempotent");
    }
}

#[test]
#[ignore]
fn test_guest_rejects_malformed_source() {
    let (_engine, mut instance) = instantiate(HostConfig::default());

    let err = instance
        .transform_bytes(&[0x80], TransformKind::Identity)
        .unwrap_err();

    assert!(matches!(err, Error::Guest(Sentinel::Decoding)));
}

#[test]
#[ignore]
fn test_guest_capacity_boundary() {
    let config = HostConfig::builder().heap_size(9).build().unwrap();
    let (_engine, mut instance) = instantiate(config);
    assert_eq!(instance.transform("hello", TransformKind::Identity).unwrap(), "hello");

    let config = HostConfig::builder().heap_size(8).build().unwrap();
    let (_engine, mut instance) = instantiate(config);
    let err = instance.transform("hello", TransformKind::Identity).unwrap_err();
    assert!(matches!(err, Error::Guest(Sentinel::CapacityExceeded)));
}
