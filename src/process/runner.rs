// ABOUTME: Cancellable execution of resolved host tools.
// ABOUTME: Builder-style invocations with captured, combined output.

use super::error::CommandError;
use super::toolbox::Toolbox;
use std::ffi::OsStr;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Per-command timeout when none is configured.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Output from a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, _) => stderr.to_string(),
            (false, true) => stdout.to_string(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs host tools under one cancellation token and timeout.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    toolbox: Arc<Toolbox>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl CommandRunner {
    pub fn new(toolbox: Arc<Toolbox>) -> Self {
        Self {
            toolbox,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Same tools and timeout, but immune to this runner's cancellation.
    /// Cleanup (unmount, container removal) must still run after a cancel.
    pub fn detached(&self) -> Self {
        Self {
            toolbox: Arc::clone(&self.toolbox),
            timeout: self.timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start building an invocation of `tool`.
    pub fn tool(&self, tool: &str) -> Result<Invocation<'_>, CommandError> {
        let path = self
            .toolbox
            .resolve(tool)
            .ok_or_else(|| CommandError::NotFound {
                tool: tool.to_string(),
            })?;

        Ok(Invocation {
            runner: self,
            program: tool.to_string(),
            line: vec![path.display().to_string()],
            command: Command::new(path),
            stdin: None,
        })
    }

    pub(super) fn check_cancelled(&self, program: &str) -> Result<(), CommandError> {
        if self.cancel.is_cancelled() {
            return Err(CommandError::Cancelled {
                program: program.to_string(),
            });
        }
        Ok(())
    }

    /// Drive `work` to completion unless cancelled or timed out first.
    ///
    /// Dropping `work` drops the child handles inside it, which kills the
    /// processes (`kill_on_drop`).
    pub(super) async fn supervise<T, F>(&self, program: &str, work: F) -> Result<T, CommandError>
    where
        F: Future<Output = std::io::Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CommandError::Cancelled {
                program: program.to_string(),
            }),
            result = tokio::time::timeout(self.timeout, work) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(source)) => Err(CommandError::Io {
                    program: program.to_string(),
                    source,
                }),
                Err(_) => Err(CommandError::TimedOut {
                    program: program.to_string(),
                    timeout: self.timeout,
                }),
            },
        }
    }
}

/// A single pending tool invocation.
pub struct Invocation<'a> {
    runner: &'a CommandRunner,
    program: String,
    line: Vec<String>,
    command: Command,
    stdin: Option<Vec<u8>>,
}

impl std::fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("line", &self.command_line())
            .finish()
    }
}

impl<'a> Invocation<'a> {
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.line.push(arg.as_ref().to_string_lossy().into_owned());
        self.command.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    /// Argument that must not appear in logs.
    pub fn secret_arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.line.push("<redacted>".to_string());
        self.command.arg(arg);
        self
    }

    /// Bytes written to the tool's stdin before waiting on it.
    pub fn stdin_bytes(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The command line as logged (secrets redacted).
    pub fn command_line(&self) -> String {
        self.line.join(" ")
    }

    /// Configure stdio and lifetime for spawning.
    pub(super) fn into_command(mut self, stdin: Stdio, stdout: Stdio) -> (String, Command) {
        tracing::debug!("running {}", self.command_line());
        self.command
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        (self.program, self.command)
    }

    /// Run to completion. A non-zero exit becomes `CommandError::Failed`
    /// carrying the combined output.
    pub async fn run(mut self) -> Result<CommandOutput, CommandError> {
        let runner = self.runner;
        let input = self.stdin.take();
        runner.check_cancelled(&self.program)?;

        let stdin = if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let (program, mut command) = self.into_command(stdin, Stdio::piped());

        let mut child = command.spawn().map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pipe = child.stdin.take();

        let work = async move {
            if let (Some(mut pipe), Some(bytes)) = (pipe, input) {
                match pipe.write_all(&bytes).await {
                    // The tool may exit without reading; its status tells the story.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            child.wait_with_output().await
        };

        let output = CommandOutput::from(runner.supervise(&program, work).await?);
        if !output.success() {
            return Err(CommandError::Failed {
                program,
                code: output.exit_code,
                output: output.combined(),
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn runner() -> CommandRunner {
        CommandRunner::new(Arc::new(Toolbox::from_env()))
    }

    #[tokio::test]
    async fn captures_stdout() {
        let runner = runner();
        let output = runner
            .tool("sh")
            .unwrap()
            .args(["-c", "echo hello"])
            .run()
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn failure_carries_combined_output() {
        let runner = runner();
        let err = runner
            .tool("sh")
            .unwrap()
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .run()
            .await
            .unwrap_err();
        match err {
            CommandError::Failed { code, output, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(output, "out\nerr");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn feeds_stdin() {
        let runner = runner();
        let output = runner
            .tool("cat")
            .unwrap()
            .stdin_bytes("secret")
            .run()
            .await
            .unwrap();
        assert_eq!(output.stdout, "secret");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let runner = runner();
        let err = runner.tool("definitely_not_a_real_command_12345").unwrap_err();
        assert!(matches!(err, CommandError::NotFound { .. }));
    }

    #[tokio::test]
    async fn cancellation_kills_running_command() {
        let cancel = CancellationToken::new();
        let runner = runner().with_cancellation(cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = runner
            .tool("sleep")
            .unwrap()
            .arg("30")
            .run()
            .await
            .unwrap_err();
        assert!(err.is_cancelled(), "expected cancellation, got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn cancelled_token_prevents_spawn() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runner = runner().with_cancellation(cancel);
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");

        let err = runner
            .tool("touch")
            .unwrap()
            .arg_path(&marker)
            .run()
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let runner = runner().with_timeout(Duration::from_millis(100));
        let err = runner
            .tool("sleep")
            .unwrap()
            .arg("30")
            .run()
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }

    #[test]
    fn secret_args_are_redacted_from_command_line() {
        let runner = runner();
        let invocation = runner
            .tool("sh")
            .unwrap()
            .arg("--src-creds")
            .secret_arg("bob:hunter2");
        let line = invocation.command_line();
        assert!(line.contains("--src-creds <redacted>"));
        assert!(!line.contains("hunter2"));
    }

    #[test]
    fn combined_output_joins_streams() {
        let output = CommandOutput {
            exit_code: Some(1),
            stdout: "a\n".to_string(),
            stderr: "".to_string(),
        };
        assert_eq!(output.combined(), "a");
    }
}
