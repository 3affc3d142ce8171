// ABOUTME: Pull-and-extract backends and their selection policy.
// ABOUTME: skopeo+buildah first, then podman, then docker.

mod detection;
mod engine;
mod error;
mod sealed;
mod skopeo;
mod traits;
mod types;

pub use detection::{SELECTION_ORDER, SelectionError, detect_backend, select_backend};
pub use engine::{Engine, EngineBackend};
pub use error::{BackendError, BackendErrorKind};
pub use skopeo::SkopeoBuildahBackend;
pub use traits::{Backend, ExtractRequest, ExtractedTree, backend_for};
pub use types::BackendKind;
