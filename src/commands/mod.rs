// ABOUTME: Command module aggregator for the ocirootfs CLI.
// ABOUTME: Re-exports build and probe command handlers.

mod build;
mod probe;

pub use build::{BuildArgs, build};
pub use probe::probe;
