//! Kinds command: lists the transform kinds and their wire values.

use crate::output::{ExitCode, OutputFormat};
use anyhow::{Context, Result};
use serde::Serialize;
use transform_core::TransformKind;

/// One row of the kinds listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KindInfo {
    /// Wire value under the ordinal convention
    pub ordinal: u32,
    /// Wire value under the name convention
    pub name: &'static str,
    /// What the reference transform does
    pub description: &'static str,
}

impl From<TransformKind> for KindInfo {
    fn from(kind: TransformKind) -> Self {
        Self {
            ordinal: kind.ordinal(),
            name: kind.name(),
            description: kind.description(),
        }
    }
}

/// Returns every kind in ordinal order.
#[must_use]
pub fn list_kinds() -> Vec<KindInfo> {
    TransformKind::ALL.into_iter().map(KindInfo::from).collect()
}

/// Runs the kinds command.
///
/// # Errors
///
/// Returns an error if formatting fails.
pub fn run(output_format: OutputFormat) -> Result<ExitCode> {
    let formatted = crate::formatters::format_output(&list_kinds(), output_format)
        .context("failed to format kinds")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_kinds_in_ordinal_order() {
        let kinds = list_kinds();
        assert_eq!(kinds.len(), TransformKind::ALL.len());
        for (index, info) in kinds.iter().enumerate() {
            assert_eq!(info.ordinal as usize, index);
        }
        assert_eq!(kinds[0].name, "Identity");
        assert_eq!(kinds[14].name, "IntTypeToLongType");
    }

    #[test]
    fn test_kinds_json() {
        let json = crate::formatters::format_output(&list_kinds(), OutputFormat::Text).unwrap();
        assert!(json.starts_with("[{\"ordinal\":0,\"name\":\"Identity\""));
    }

    #[test]
    fn test_run() {
        assert_eq!(run(OutputFormat::Json).unwrap(), ExitCode::SUCCESS);
    }
}
