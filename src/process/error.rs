// ABOUTME: Error types for external command execution.
// ABOUTME: Failures keep the tool's combined output for diagnosis.

use std::time::Duration;

/// Errors from running a single external tool.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{tool} not found on search path")]
    NotFound { tool: String },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed ({status}): {output}", status = exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("{program} was cancelled")]
    Cancelled { program: String },

    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl CommandError {
    /// Combined stdout/stderr of a tool that ran and failed.
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandError::Failed { output, .. } => Some(output),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::TimedOut { .. })
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "killed by signal".to_string(),
    }
}

/// Errors from a producer → consumer stream between two tools.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("failed to start pipe: {0}")]
    Start(#[source] CommandError),

    #[error("producer failed: {0}")]
    Producer(#[source] CommandError),

    /// `relayed` is the byte count the consumer received, when the relay
    /// itself completed.
    #[error("consumer failed: {source}")]
    Consumer {
        #[source]
        source: CommandError,
        relayed: Option<u64>,
    },

    #[error("relay between processes failed: {0}")]
    Relay(#[source] std::io::Error),

    #[error("pipe interrupted: {0}")]
    Interrupted(#[source] CommandError),
}

impl PipeError {
    /// The underlying command error, if any.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            PipeError::Start(e)
            | PipeError::Producer(e)
            | PipeError::Consumer { source: e, .. }
            | PipeError::Interrupted(e) => Some(e),
            PipeError::Relay(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_display_includes_output() {
        let err = CommandError::Failed {
            program: "skopeo".to_string(),
            code: Some(1),
            output: "manifest unknown".to_string(),
        };
        let shown = err.to_string();
        assert!(shown.contains("skopeo"));
        assert!(shown.contains("exit code 1"));
        assert!(shown.contains("manifest unknown"));
        assert_eq!(err.output(), Some("manifest unknown"));
    }

    #[test]
    fn signal_exit_is_labelled() {
        let err = CommandError::Failed {
            program: "tar".to_string(),
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("killed by signal"));
    }

    #[test]
    fn pipe_error_exposes_command_error() {
        let err = PipeError::Interrupted(CommandError::Cancelled {
            program: "docker".to_string(),
        });
        assert!(err.command_error().is_some_and(CommandError::is_cancelled));
        assert!(PipeError::Relay(std::io::ErrorKind::BrokenPipe.into())
            .command_error()
            .is_none());
    }
}
