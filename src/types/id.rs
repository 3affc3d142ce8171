// ABOUTME: Phantom-typed identifiers for compile-time type safety.
// ABOUTME: Keeps per-call operation tokens and container names from being swapped.

use serde::{Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
/// Using empty enums prevents instantiation and requires no trait bounds.
pub enum ContainerMarker {}
pub enum OperationMarker {}

/// A type-safe identifier that prevents accidental mixing of different ID types.
///
/// A `ContainerName` is derived from an `OperationId`, and both are plain
/// strings underneath; the marker keeps one from being passed where the other
/// is expected.
#[must_use = "IDs reference resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl Id<OperationMarker> {
    /// Operation token for the `index`-th materialization of a manager.
    pub fn from_index(index: u64) -> Self {
        Self::new(format!("op-{index}"))
    }

    /// Container name unique to this operation and host process.
    pub fn container_name(&self, prefix: &str) -> ContainerName {
        ContainerName::new(format!("{}-{}-{}", prefix, std::process::id(), self.value))
    }
}

// Manual trait implementations that don't require T to implement the trait.
// This is necessary because T is only used as a phantom type marker.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Id").field("value", &self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

pub type ContainerName = Id<ContainerMarker>;
pub type OperationId = Id<OperationMarker>;
