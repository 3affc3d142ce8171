// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Image references, registry credentials, and phantom-typed names.

mod credentials;
mod id;
mod image_ref;

pub use credentials::Credentials;
pub use id::{ContainerName, OperationId};
pub use image_ref::{ImageRef, ParseImageRefError};
