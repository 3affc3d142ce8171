// ABOUTME: External tool resolution and execution.
// ABOUTME: Every shell-out goes through here for cancellation, timeouts and captured output.

mod error;
mod pipe;
mod runner;
mod toolbox;

pub use error::{CommandError, PipeError};
pub use runner::{CommandOutput, CommandRunner, DEFAULT_COMMAND_TIMEOUT, Invocation};
pub use toolbox::{ToolProbe, Toolbox};

/// Quote a value for inclusion in a `sh -c` script.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
