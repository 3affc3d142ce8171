// ABOUTME: Result of a successful materialization.
// ABOUTME: Serialized as-is for JSON output.

use crate::backend::BackendKind;
use crate::diagnostics::Warning;
use crate::sizing::SizeSpec;
use crate::types::OperationId;
use serde::Serialize;
use std::path::PathBuf;

/// What was built, how, and what went wrong along the way without failing.
#[derive(Debug, Clone, Serialize)]
pub struct RootfsReport {
    pub output: PathBuf,
    pub backend: BackendKind,
    pub size: SizeSpec,
    /// Measured size of the extracted tree, `None` if sizing fell back.
    pub tree_bytes: Option<u64>,
    pub operation: OperationId,
    pub warnings: Vec<Warning>,
}

impl RootfsReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
