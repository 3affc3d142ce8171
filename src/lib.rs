// ABOUTME: Library root for ocirootfs - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filesystem;
pub mod output;
pub mod process;
pub mod rootfs;
pub mod sizing;
pub mod types;
pub mod workspace;

pub use rootfs::{ManagerSettings, RootfsError, RootfsErrorKind, RootfsManager, RootfsReport};
