//! Sandbox behaviour: misbehaving guests, resource limits and module loading.

use std::io::Write;
use transform_host::{Error, HostConfig, Sentinel, TransformEngine, TransformKind};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("transform_host=debug")
        .with_test_writer()
        .try_init();
}

/// Guest whose `transform` body is `body`; `alloc` always returns 1024.
fn stub_guest(body: &str) -> Vec<u8> {
    let wat = format!(
        r#"
        (module
            (memory (export "memory") 1)
            (func (export "alloc") (param i32) (result i32) (i32.const 1024))
            (func (export "dealloc") (param i32))
            (func (export "transform") (param $src i32) (param $kind i32) (result i32)
                {body}
            )
        )
        "#
    );
    wat::parse_str(wat).expect("Failed to parse WAT")
}

fn small_heap() -> HostConfig {
    HostConfig::builder().heap_size(64).build().unwrap()
}

fn run_stub(body: &str, config: HostConfig) -> Result<String, Error> {
    init_tracing();
    let engine = TransformEngine::new(config)?;
    let module = engine.load(&stub_guest(body))?;
    let mut instance = engine.instantiate(&module)?;
    instance.transform("hello", TransformKind::Identity)
}

#[test]
fn test_every_sentinel_is_reported() {
    for sentinel in Sentinel::ALL {
        let body = format!("(i32.const {})", sentinel.code());
        let err = run_stub(&body, small_heap()).unwrap_err();
        assert!(matches!(err, Error::Guest(s) if s == sentinel), "{err}");
    }
}

#[test]
fn test_zero_word_is_unknown_sentinel() {
    let err = run_stub("(i32.const 0)", small_heap()).unwrap_err();
    assert!(matches!(err, Error::UnknownSentinel { code: 0 }), "{err}");
}

#[test]
fn test_unassigned_sentinel_code() {
    let err = run_stub("(i32.const 7)", small_heap()).unwrap_err();
    assert!(matches!(err, Error::UnknownSentinel { code: 7 }), "{err}");

    let err = run_stub("(i32.const 15)", small_heap()).unwrap_err();
    assert!(matches!(err, Error::UnknownSentinel { code: 15 }), "{err}");
}

#[test]
fn test_in_place_result_at_wrong_address() {
    let err = run_stub("(i32.const 2048)", small_heap()).unwrap_err();
    assert!(matches!(err, Error::ContractViolation { .. }), "{err}");
    assert!(err.to_string().contains("expected heap base"));
}

#[test]
fn test_length_prefix_overrunning_heap() {
    let body = r"
        (i32.store (local.get $src) (i32.const 1000))
        (local.get $src)
    ";
    let err = run_stub(body, small_heap()).unwrap_err();
    assert!(matches!(err, Error::ContractViolation { .. }), "{err}");
    assert!(err.to_string().contains("overruns"));
}

#[test]
fn test_result_that_is_not_utf8() {
    let body = r"
        (i32.store (local.get $src) (i32.const 1))
        (i32.store8 offset=4 (local.get $src) (i32.const 0x80))
        (local.get $src)
    ";
    let err = run_stub(body, small_heap()).unwrap_err();
    assert!(
        matches!(&err, Error::InvalidUtf8 { context, .. } if context == "guest result"),
        "{err}"
    );
}

#[test]
fn test_empty_in_place_result_is_not_an_error() {
    let body = r"
        (i32.store (local.get $src) (i32.const 0))
        (local.get $src)
    ";
    assert_eq!(run_stub(body, small_heap()).unwrap(), "");
}

#[test]
fn test_guest_trap() {
    let err = run_stub("(unreachable)", small_heap()).unwrap_err();
    assert!(err.is_trap(), "{err}");
}

#[test]
fn test_fuel_exhaustion_traps() {
    let config = HostConfig::builder()
        .heap_size(64)
        .max_fuel(10_000)
        .build()
        .unwrap();
    let body = r"
        (loop $spin (br $spin))
        (i32.const 3)
    ";
    let err = run_stub(body, config).unwrap_err();
    assert!(err.is_trap(), "{err}");
}

#[test]
fn test_fuel_is_refilled_per_call() {
    init_tracing();
    let config = HostConfig::builder()
        .heap_size(64)
        .max_fuel(100_000)
        .build()
        .unwrap();
    let engine = TransformEngine::new(config).unwrap();
    let body = r"
        (i32.store (local.get $src) (i32.const 0))
        (local.get $src)
    ";
    let module = engine.load(&stub_guest(body)).unwrap();
    let mut instance = engine.instantiate(&module).unwrap();

    for _ in 0..100 {
        assert_eq!(instance.transform("x", TransformKind::Identity).unwrap(), "");
    }
}

#[test]
fn test_memory_limit_blocks_instantiation() {
    init_tracing();
    let wat = r#"
        (module
            (memory (export "memory") 100)
            (func (export "alloc") (param i32) (result i32) (i32.const 1024))
            (func (export "dealloc") (param i32))
            (func (export "transform") (param i32 i32) (result i32) (i32.const 3))
        )
    "#;
    let config = HostConfig::builder()
        .heap_size(64)
        .memory_limit_mb(1)
        .build()
        .unwrap();
    let engine = TransformEngine::new(config).unwrap();
    let module = engine.load(&wat::parse_str(wat).unwrap()).unwrap();

    let err = engine.instantiate(&module).unwrap_err();
    assert!(matches!(err, Error::WasmError { .. }), "{err}");
}

#[test]
fn test_failed_heap_reservation() {
    init_tracing();
    let wat = r#"
        (module
            (memory (export "memory") 1)
            (func (export "alloc") (param i32) (result i32) (i32.const 0))
            (func (export "dealloc") (param i32))
            (func (export "transform") (param i32 i32) (result i32) (i32.const 3))
        )
    "#;
    let engine = TransformEngine::new(small_heap()).unwrap();
    let module = engine.load(&wat::parse_str(wat).unwrap()).unwrap();

    let err = engine.instantiate(&module).unwrap_err();
    assert!(matches!(err, Error::AllocationFailure { size: 64 }), "{err}");
}

#[test]
fn test_heap_larger_than_guest_memory() {
    init_tracing();
    // one page cannot hold the default heap at 1024
    let engine = TransformEngine::new(HostConfig::default()).unwrap();
    let module = engine.load(&stub_guest("(i32.const 3)")).unwrap();

    let err = engine.instantiate(&module).unwrap_err();
    assert!(matches!(err, Error::ContractViolation { .. }), "{err}");
}

#[test]
fn test_wasi_guest_requires_wasi_linking() {
    init_tracing();
    let wat = r#"
        (module
            (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
            (memory (export "memory") 1)
            (func (export "alloc") (param i32) (result i32) (i32.const 1024))
            (func (export "dealloc") (param i32))
            (func (export "transform") (param i32 i32) (result i32) (i32.const 3))
        )
    "#;
    let wasm = wat::parse_str(wat).unwrap();

    let engine = TransformEngine::new(small_heap()).unwrap();
    let module = engine.load(&wasm).unwrap();
    assert!(engine.instantiate(&module).is_err());

    let config = HostConfig::builder()
        .heap_size(64)
        .enable_wasi(true)
        .build()
        .unwrap();
    let engine = TransformEngine::new(config).unwrap();
    let module = engine.load(&wasm).unwrap();
    let mut instance = engine.instantiate(&module).unwrap();
    let err = instance
        .transform("hello", TransformKind::Identity)
        .unwrap_err();
    assert!(err.is_invalid_kind());
}

#[test]
fn test_load_file() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&stub_guest("(i32.const 3)")).unwrap();

    let engine = TransformEngine::new(small_heap()).unwrap();
    let module = engine.load_file(file.path()).unwrap();
    assert_eq!(module.key().as_str().len(), "wasm_".len() + 64);

    let err = engine
        .load_file(file.path().with_extension("missing"))
        .unwrap_err();
    assert!(err.to_string().contains("Failed to read module"));
}

#[test]
fn test_module_cache_and_stats() {
    init_tracing();
    let engine = TransformEngine::new(small_heap()).unwrap();
    let wasm = stub_guest("(i32.const 3)");

    let module = engine.load(&wasm).unwrap();
    let _ = engine.load(&wasm).unwrap();
    let _ = engine.load(&stub_guest("(i32.const 2)")).unwrap();
    assert_eq!(engine.module_cache().len(), 2);

    let mut instance = engine.instantiate(&module).unwrap();
    for _ in 0..3 {
        assert!(instance.transform("x", TransformKind::Identity).is_err());
    }

    let stats = engine.collect_stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 2);
    assert_eq!(stats.total_calls, 3);
    assert_eq!(stats.failed_calls, 3);
    assert_eq!(stats.success_rate(), Some(0.0));

    let json = serde_json::to_value(stats).unwrap();
    assert_eq!(json["failed_calls"], 3);

    engine.clear_cache();
    assert!(engine.module_cache().is_empty());
}

#[test]
fn test_cache_capacity_evicts_oldest() {
    init_tracing();
    let config = HostConfig::builder()
        .heap_size(64)
        .cache_capacity(1)
        .build()
        .unwrap();
    let engine = TransformEngine::new(config).unwrap();
    let first = engine.load(&stub_guest("(i32.const 1)")).unwrap();
    let second = engine.load(&stub_guest("(i32.const 2)")).unwrap();

    assert_eq!(engine.module_cache().len(), 1);
    assert!(!engine.module_cache().contains(first.key()));
    assert!(engine.module_cache().contains(second.key()));
}
