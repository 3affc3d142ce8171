// ABOUTME: Target filesystem capacity from an extracted tree's disk usage.
// ABOUTME: Adds 20% overhead and rounds up to the next 100 MiB quantum.

use crate::diagnostics::{Diagnostics, Warning};
use crate::process::{CommandError, CommandRunner};
use serde::Serialize;
use std::fmt;
use std::path::Path;

pub const MIB: u64 = 1024 * 1024;

/// Capacity quantum: images are always a whole number of these.
pub const SIZE_QUANTUM: u64 = 100 * MIB;

/// Capacity used when the tree cannot be measured (the classic "1G").
pub const DEFAULT_FALLBACK_SIZE: SizeSpec = SizeSpec::from_mib(1024);

/// Capacity of a filesystem image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SizeSpec {
    bytes: u64,
}

impl SizeSpec {
    /// Largest MiB count whose byte size fits in a `u64`.
    pub const MAX_MIB: u64 = u64::MAX / MIB;

    /// Saturates at `u64::MAX` bytes.
    pub const fn from_mib(mib: u64) -> Self {
        Self {
            bytes: mib.saturating_mul(MIB),
        }
    }

    /// Capacity for a tree of `tree_bytes`.
    ///
    /// `scaled = S + S/5`, then `(scaled / 100MiB + 1) * 100MiB` with integer
    /// division. A scaled size that is already a multiple of the quantum still
    /// gets one more quantum; this slack is intentional and must be kept.
    pub const fn for_tree_bytes(tree_bytes: u64) -> Self {
        let scaled = tree_bytes.saturating_add(tree_bytes / 5);
        Self {
            bytes: (scaled / SIZE_QUANTUM + 1).saturating_mul(SIZE_QUANTUM),
        }
    }

    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    pub const fn mib(&self) -> u64 {
        self.bytes / MIB
    }

    /// Size argument for `fallocate -l`, e.g. `3500M`.
    pub fn to_arg(&self) -> String {
        format!("{}M", self.mib())
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MiB", self.mib())
    }
}

/// Outcome of estimating capacity for a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    pub size: SizeSpec,
    /// Measured apparent size, `None` when the fallback was used.
    pub tree_bytes: Option<u64>,
}

/// Apparent byte size of `tree` as reported by `du -sb`.
pub async fn measure_tree(runner: &CommandRunner, tree: &Path) -> Result<u64, CommandError> {
    let output = runner.tool("du")?.arg("-sb").arg_path(tree).run().await?;
    parse_du_output(&output.stdout).ok_or_else(|| CommandError::Failed {
        program: "du".to_string(),
        code: output.exit_code,
        output: format!("unparsable output: {}", output.stdout.trim()),
    })
}

fn parse_du_output(stdout: &str) -> Option<u64> {
    stdout.split_whitespace().next()?.parse().ok()
}

/// Estimate capacity for `tree`, falling back to `fallback` if it cannot be
/// measured. Only cancellation and timeouts are returned as errors.
pub async fn estimate_size(
    runner: &CommandRunner,
    tree: &Path,
    fallback: SizeSpec,
    diagnostics: &mut Diagnostics,
) -> Result<SizeEstimate, CommandError> {
    match measure_tree(runner, tree).await {
        Ok(tree_bytes) => {
            let size = SizeSpec::for_tree_bytes(tree_bytes);
            tracing::debug!("tree {} is {} bytes -> {}", tree.display(), tree_bytes, size);
            Ok(SizeEstimate {
                size,
                tree_bytes: Some(tree_bytes),
            })
        }
        Err(e) if e.is_cancelled() || e.is_timeout() => Err(e),
        Err(e) => {
            diagnostics.warn(Warning::sizing_fallback(format!(
                "failed to calculate size of {}, using default {}: {}",
                tree.display(),
                fallback,
                e
            )));
            Ok(SizeEstimate {
                size: fallback,
                tree_bytes: None,
            })
        }
    }
}
