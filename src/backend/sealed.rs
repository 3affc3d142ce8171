// ABOUTME: Sealed trait pattern for backend traits.
// ABOUTME: Prevents external implementations, allowing non-breaking evolution.

/// Sealed trait to prevent external implementations.
///
/// Only the backends in this crate can implement `Backend`, so methods can be
/// added to it without breaking semver.
pub trait Sealed {}
