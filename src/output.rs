// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a warning (stderr in normal mode, a JSON event otherwise).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => emit(
                &JsonEvent {
                    event: "warning",
                    message,
                    duration_secs: None,
                    data: None::<()>,
                },
                false,
            ),
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        self.success_with(message, None::<()>);
    }

    /// Print a success message; in JSON mode `data` rides along on the event.
    pub fn success_with<T: Serialize>(&self, message: &str, data: Option<T>) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => emit(
                &JsonEvent {
                    event: "success",
                    message,
                    duration_secs: self.duration(),
                    data,
                },
                false,
            ),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => emit(
                &JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration(),
                    data: None::<()>,
                },
                true,
            ),
        }
    }
}

fn emit<T: Serialize>(event: &JsonEvent<'_, T>, to_stderr: bool) {
    if let Ok(json) = serde_json::to_string(event) {
        if to_stderr {
            eprintln!("{json}");
        } else {
            println!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a, T> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_event_omits_empty_fields() {
        let event = JsonEvent {
            event: "success",
            message: "done",
            duration_secs: None,
            data: None::<()>,
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"success","message":"done"}"#
        );
    }

    #[test]
    fn json_event_carries_data() {
        let event = JsonEvent {
            event: "success",
            message: "done",
            duration_secs: Some(1.5),
            data: Some(serde_json::json!({ "backend": "docker" })),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""duration_secs":1.5"#));
        assert!(json.contains(r#""data":{"backend":"docker"}"#));
    }

    #[test]
    fn elapsed_is_zero_before_timer() {
        let output = Output::new(OutputMode::Quiet);
        assert_eq!(output.elapsed_secs(), 0.0);
        assert_eq!(output.mode(), OutputMode::Quiet);
    }
}
