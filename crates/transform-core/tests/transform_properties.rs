//! Properties of the reference transform collaborator over a C# corpus.

use transform_core::{TransformKind, apply};

const CORPUS: &[&str] = &[
    "",
    "hello",
    "a+b",
    "\u{feff}using System;\nclass Program { static void Main() { } }",
    "public class Counter\n{\n    private int count;\n    public void Tick() { count++; count += 2; }\n}\n",
    "struct Point { public int X; public int Y; }",
    "var q = from p in people orderby p.Age ascending, p.Name descending select p;",
    "checked { x = unchecked(y * 2); } unchecked { z = checked(w + 1); }",
    "for (int i = 0; i < 10; ++i) { total += i--; }",
    "bool ok = true && !false; string s = \"true or false\"; // true",
    "var raw = \"\"\"\n  int true \"\"\"; var v = @\"C:\\path\\int\";",
    "/* class Foo */ class Bar : IFoo where T : class { }",
    "int größe = 42; // Größe in Bytes ✓",
    "x+++y; --z; w--;",
];

#[test]
fn test_every_kind_is_idempotent() {
    for source in CORPUS {
        for kind in TransformKind::ALL {
            let once = apply(source, kind);
            let twice = apply(&once, kind);
            assert_eq!(once, twice, "{kind} is not idempotent on {source:?}");
        }
    }
}

#[test]
fn test_identity_preserves_every_sample() {
    for source in CORPUS {
        assert_eq!(apply(source, TransformKind::Identity), *source);
    }
}

#[test]
fn test_results_never_gain_nul_bytes() {
    for source in CORPUS {
        for kind in TransformKind::ALL {
            assert!(!apply(source, kind).contains('\0'));
        }
    }
}

#[test]
fn test_inverse_pairs_restore_keyword_swaps() {
    let source = "bool a = true; orderby x ascending; checked { }";
    let flipped = apply(source, TransformKind::TrueToFalse);
    assert_eq!(apply(&flipped, TransformKind::FalseToTrue), source);

    let flipped = apply(source, TransformKind::OrderByAscToOrderByDesc);
    assert_eq!(apply(&flipped, TransformKind::OrderByDescToOrderByAsc), source);

    let flipped = apply(source, TransformKind::CheckedStmtToUncheckedStmt);
    assert_eq!(apply(&flipped, TransformKind::UncheckedStmtToCheckedStmt), source);
}

#[test]
fn test_bom_is_passed_through() {
    let source = "\u{feff}int x;";
    let result = apply(source, TransformKind::IntTypeToLongType);
    assert!(result.starts_with('\u{feff}'));
    assert_eq!(result, "\u{feff}long x;");
}
