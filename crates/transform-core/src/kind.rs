//! The closed set of transform kinds.
//!
//! A kind travels over the boundary either as its ordinal (Convention A)
//! or as its exact name (Convention B). Both encodings are strict: an
//! unknown ordinal or name is [`Error::InvalidKind`].
//!
//! Ordinals are part of the wire contract. New kinds are appended; existing
//! ones are never renumbered. Callers that must interoperate with other
//! numberings select kinds by name.
//!
//! # Examples
//!
//! ```
//! use transform_core::TransformKind;
//!
//! let kind: TransformKind = "TrueToFalse".parse().unwrap();
//! assert_eq!(kind.ordinal(), 7);
//! assert_eq!(TransformKind::from_ordinal(0), Some(TransformKind::Identity));
//! assert!("truetofalse".parse::<TransformKind>().is_err());
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transform kind.
///
/// Every kind of the reference collaborator is idempotent:
/// `apply(apply(t, k), k) == apply(t, k)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransformKind {
    /// Returns the source unchanged.
    Identity,
    /// `checked { .. }` becomes `unchecked { .. }`.
    CheckedStmtToUncheckedStmt,
    /// `unchecked { .. }` becomes `checked { .. }`.
    UncheckedStmtToCheckedStmt,
    /// `checked(..)` becomes `unchecked(..)`.
    CheckedExprToUncheckedExpr,
    /// `unchecked(..)` becomes `checked(..)`.
    UncheckedExprToCheckedExpr,
    /// `i++` becomes `++i`.
    PostfixToPrefix,
    /// `++i` becomes `i++`.
    PrefixToPostfix,
    /// `true` becomes `false`.
    TrueToFalse,
    /// `false` becomes `true`.
    FalseToTrue,
    /// `a += b` becomes `a = b`.
    AddAssignToAssign,
    /// `ascending` becomes `descending`.
    OrderByAscToOrderByDesc,
    /// `descending` becomes `ascending`.
    OrderByDescToOrderByAsc,
    /// `class Name` becomes `struct Name`.
    ClassDeclToStructDecl,
    /// `struct Name` becomes `class Name`.
    StructDeclToClassDecl,
    /// `int` becomes `long`.
    IntTypeToLongType,
}

impl TransformKind {
    /// All kinds in ordinal order.
    pub const ALL: [Self; 15] = [
        Self::Identity,
        Self::CheckedStmtToUncheckedStmt,
        Self::UncheckedStmtToCheckedStmt,
        Self::CheckedExprToUncheckedExpr,
        Self::UncheckedExprToCheckedExpr,
        Self::PostfixToPrefix,
        Self::PrefixToPostfix,
        Self::TrueToFalse,
        Self::FalseToTrue,
        Self::AddAssignToAssign,
        Self::OrderByAscToOrderByDesc,
        Self::OrderByDescToOrderByAsc,
        Self::ClassDeclToStructDecl,
        Self::StructDeclToClassDecl,
        Self::IntTypeToLongType,
    ];

    /// Longest canonical name in bytes.
    pub const MAX_NAME_LEN: usize = 26;

    /// Returns the wire ordinal.
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> u32 {
        self as u32
    }

    /// Looks up a kind by ordinal.
    #[must_use]
    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| Self::ALL.get(index))
            .copied()
    }

    /// Decodes a Convention A selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKind`] for negative or out-of-range values.
    ///
    /// # Examples
    ///
    /// ```
    /// use transform_core::TransformKind;
    ///
    /// assert_eq!(TransformKind::from_wire_ordinal(14).unwrap(), TransformKind::IntTypeToLongType);
    /// assert!(TransformKind::from_wire_ordinal(15).is_err());
    /// assert!(TransformKind::from_wire_ordinal(-1).is_err());
    /// ```
    pub fn from_wire_ordinal(raw: i32) -> Result<Self> {
        u32::try_from(raw)
            .ok()
            .and_then(Self::from_ordinal)
            .ok_or_else(|| Error::InvalidKind {
                value: raw.to_string(),
            })
    }

    /// Returns the canonical name, which is also the Convention B wire value.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identity => "Identity",
            Self::CheckedStmtToUncheckedStmt => "CheckedStmtToUncheckedStmt",
            Self::UncheckedStmtToCheckedStmt => "UncheckedStmtToCheckedStmt",
            Self::CheckedExprToUncheckedExpr => "CheckedExprToUncheckedExpr",
            Self::UncheckedExprToCheckedExpr => "UncheckedExprToCheckedExpr",
            Self::PostfixToPrefix => "PostfixToPrefix",
            Self::PrefixToPostfix => "PrefixToPostfix",
            Self::TrueToFalse => "TrueToFalse",
            Self::FalseToTrue => "FalseToTrue",
            Self::AddAssignToAssign => "AddAssignToAssign",
            Self::OrderByAscToOrderByDesc => "OrderByAscToOrderByDesc",
            Self::OrderByDescToOrderByAsc => "OrderByDescToOrderByAsc",
            Self::ClassDeclToStructDecl => "ClassDeclToStructDecl",
            Self::StructDeclToClassDecl => "StructDeclToClassDecl",
            Self::IntTypeToLongType => "IntTypeToLongType",
        }
    }

    /// Returns a one-line description for listings.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Identity => "Return the source unchanged",
            Self::CheckedStmtToUncheckedStmt => "Turn checked blocks into unchecked blocks",
            Self::UncheckedStmtToCheckedStmt => "Turn unchecked blocks into checked blocks",
            Self::CheckedExprToUncheckedExpr => "Turn checked(...) into unchecked(...)",
            Self::UncheckedExprToCheckedExpr => "Turn unchecked(...) into checked(...)",
            Self::PostfixToPrefix => "Rewrite x++ / x-- as ++x / --x",
            Self::PrefixToPostfix => "Rewrite ++x / --x as x++ / x--",
            Self::TrueToFalse => "Replace the literal true with false",
            Self::FalseToTrue => "Replace the literal false with true",
            Self::AddAssignToAssign => "Replace += with =",
            Self::OrderByAscToOrderByDesc => "Flip ascending orderings to descending",
            Self::OrderByDescToOrderByAsc => "Flip descending orderings to ascending",
            Self::ClassDeclToStructDecl => "Declare classes as structs",
            Self::StructDeclToClassDecl => "Declare structs as classes",
            Self::IntTypeToLongType => "Widen int to long",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformKind {
    type Err = Error;

    /// Parses a canonical name. Matching is exact and case-sensitive.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|kind| kind.name() == s)
            .copied()
            .ok_or_else(|| Error::InvalidKind {
                value: s.to_string(),
            })
    }
}

impl TryFrom<i32> for TransformKind {
    type Error = Error;

    fn try_from(raw: i32) -> Result<Self> {
        Self::from_wire_ordinal(raw)
    }
}
