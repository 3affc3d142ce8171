// ABOUTME: Diagnostics accumulator for non-fatal warnings during a rootfs build.
// ABOUTME: Degraded sizing and failed cleanups land here instead of failing the call.

use serde::Serialize;

/// Collects non-fatal warnings during a materialization.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a materialization.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Disk usage could not be measured; the fallback capacity was used.
    pub fn sizing_fallback(message: impl Into<String>) -> Self {
        Self::new(WarningKind::SizingFallback, message)
    }

    /// Registry login failed; the pull continues anonymously.
    pub fn login_failed(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LoginFailed, message)
    }

    /// A temporary container could not be removed.
    pub fn container_cleanup(message: impl Into<String>) -> Self {
        Self::new(WarningKind::ContainerCleanup, message)
    }

    /// A temporary directory could not be removed.
    pub fn directory_cleanup(message: impl Into<String>) -> Self {
        Self::new(WarningKind::DirectoryCleanup, message)
    }

    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Size estimate fell back to the default capacity.
    SizingFallback,
    /// Registry login failed (non-fatal).
    LoginFailed,
    /// Failed to remove a temporary container.
    ContainerCleanup,
    /// Failed to remove a temporary directory.
    DirectoryCleanup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::sizing_fallback("du failed"));
        diag.warn(Warning::container_cleanup("no such container"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
        assert_eq!(diag.into_warnings()[1].kind, WarningKind::ContainerCleanup);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(Warning::sizing_fallback("x").kind, WarningKind::SizingFallback);
        assert_eq!(Warning::login_failed("x").kind, WarningKind::LoginFailed);
        assert_eq!(
            Warning::directory_cleanup("x").kind,
            WarningKind::DirectoryCleanup
        );
    }

    #[test]
    fn warning_kind_serializes_snake_case() {
        let json = serde_json::to_string(&WarningKind::SizingFallback).unwrap();
        assert_eq!(json, "\"sizing_fallback\"");
    }
}
