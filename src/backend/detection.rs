// ABOUTME: Backend selection from installed host tools.
// ABOUTME: Pure priority function over probe results, with optional explicit override.

use super::types::BackendKind;
use crate::process::ToolProbe;

/// Priority order for auto-detection.
pub const SELECTION_ORDER: [BackendKind; 3] = [
    BackendKind::SkopeoBuildah,
    BackendKind::Podman,
    BackendKind::Docker,
];

/// Error during backend selection.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("no suitable OCI tool found (tried: skopeo+buildah, podman, docker)")]
    NoSuitableTool,

    #[error("configured backend {backend} is unavailable (missing: {})", .missing.join(", "))]
    PreferredUnavailable {
        backend: BackendKind,
        missing: Vec<String>,
    },
}

/// First backend in [`SELECTION_ORDER`] whose tools are all present.
///
/// Detection order:
/// 1. `skopeo` and `buildah` (both required; one alone does not count)
/// 2. `podman`
/// 3. `docker`
pub fn detect_backend<P: ToolProbe + ?Sized>(probe: &P) -> Option<BackendKind> {
    SELECTION_ORDER
        .into_iter()
        .find(|kind| missing_tools(probe, *kind).is_empty())
}

/// Select the backend for one materialization.
///
/// If `preferred` is set it takes precedence over auto-detection, but it
/// never falls through to another backend when its tools are missing.
pub fn select_backend<P: ToolProbe + ?Sized>(
    probe: &P,
    preferred: Option<BackendKind>,
) -> Result<BackendKind, SelectionError> {
    if let Some(backend) = preferred {
        let missing = missing_tools(probe, backend);
        if !missing.is_empty() {
            return Err(SelectionError::PreferredUnavailable { backend, missing });
        }
        return Ok(backend);
    }

    detect_backend(probe).ok_or(SelectionError::NoSuitableTool)
}

fn missing_tools<P: ToolProbe + ?Sized>(probe: &P, kind: BackendKind) -> Vec<String> {
    kind.required_tools()
        .iter()
        .filter(|tool| !probe.has_command(tool))
        .map(|tool| tool.to_string())
        .collect()
}
