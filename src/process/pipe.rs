// ABOUTME: Streams one tool's stdout into another tool's stdin.
// ABOUTME: Both processes run concurrently and are both awaited before returning.

use super::error::{CommandError, PipeError};
use super::runner::{CommandOutput, CommandRunner, Invocation};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

impl CommandRunner {
    /// Run `producer | consumer`, returning the number of bytes relayed.
    ///
    /// The relay reads everything the producer writes and forwards it to the
    /// consumer, so back-pressure works in both directions and an empty stream
    /// is a valid (zero-byte) transfer.
    pub async fn pipe(
        &self,
        producer: Invocation<'_>,
        consumer: Invocation<'_>,
    ) -> Result<u64, PipeError> {
        let label = format!("{} | {}", producer.program(), consumer.program());
        self.check_cancelled(&label).map_err(PipeError::Interrupted)?;

        let (producer_name, mut producer_cmd) = producer.into_command(Stdio::null(), Stdio::piped());
        let (consumer_name, mut consumer_cmd) = consumer.into_command(Stdio::piped(), Stdio::piped());

        let mut producer_child = producer_cmd.spawn().map_err(|source| {
            PipeError::Start(CommandError::Spawn {
                program: producer_name.clone(),
                source,
            })
        })?;
        let mut consumer_child = consumer_cmd.spawn().map_err(|source| {
            PipeError::Start(CommandError::Spawn {
                program: consumer_name.clone(),
                source,
            })
        })?;

        let (Some(mut source), Some(mut sink)) =
            (producer_child.stdout.take(), consumer_child.stdin.take())
        else {
            return Err(PipeError::Start(CommandError::Io {
                program: label,
                source: std::io::Error::other("stdio handles were not captured"),
            }));
        };

        let relay = async move {
            let bytes = tokio::io::copy(&mut source, &mut sink).await?;
            sink.shutdown().await?;
            Ok::<u64, std::io::Error>(bytes)
        };

        let work = async {
            Ok(tokio::join!(
                relay,
                producer_child.wait_with_output(),
                consumer_child.wait_with_output()
            ))
        };

        let (relayed, produced, consumed) = self
            .supervise(&label, work)
            .await
            .map_err(PipeError::Interrupted)?;

        let producer_result = finish(&producer_name, produced).map_err(PipeError::Producer);
        let delivered = relayed.as_ref().ok().copied();
        let consumer_result =
            finish(&consumer_name, consumed).map_err(|source| PipeError::Consumer {
                source,
                relayed: delivered,
            });

        // A consumer that dies early breaks the relay and then the producer;
        // blame the consumer in that case.
        if relayed.is_err() {
            consumer_result?;
            producer_result?;
        } else {
            producer_result?;
            consumer_result?;
        }

        let bytes = relayed.map_err(PipeError::Relay)?;
        tracing::debug!("{} relayed {} bytes", label, bytes);
        Ok(bytes)
    }
}

fn finish(
    program: &str,
    waited: std::io::Result<std::process::Output>,
) -> Result<CommandOutput, CommandError> {
    let output = CommandOutput::from(waited.map_err(|source| CommandError::Io {
        program: program.to_string(),
        source,
    })?);

    if !output.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            code: output.exit_code,
            output: output.combined(),
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use crate::process::{CommandRunner, PipeError, Toolbox};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn runner() -> CommandRunner {
        CommandRunner::new(Arc::new(Toolbox::from_env()))
    }

    #[tokio::test]
    async fn relays_all_bytes() {
        let runner = runner();
        let producer = runner
            .tool("sh")
            .unwrap()
            .args(["-c", "head -c 1048576 /dev/zero"]);
        let consumer = runner.tool("wc").unwrap().arg("-c");

        let bytes = runner.pipe(producer, consumer).await.unwrap();
        assert_eq!(bytes, 1_048_576);
    }

    #[tokio::test]
    async fn empty_stream_drains_cleanly() {
        let runner = runner();
        let producer = runner.tool("true").unwrap();
        let consumer = runner.tool("cat").unwrap();

        let bytes = runner.pipe(producer, consumer).await.unwrap();
        assert_eq!(bytes, 0);
    }

    #[tokio::test]
    async fn empty_tar_archive_extracts_to_empty_dir() {
        let runner = runner();
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();

        let producer = runner
            .tool("tar")
            .unwrap()
            .args(["-cf", "-", "-C"])
            .arg_path(source.path())
            .arg(".");
        let consumer = runner
            .tool("tar")
            .unwrap()
            .args(["-xf", "-", "-C"])
            .arg_path(target.path());

        let bytes = runner.pipe(producer, consumer).await.unwrap();
        assert!(bytes > 0);
        assert_eq!(std::fs::read_dir(target.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn producer_failure_is_reported() {
        let runner = runner();
        let producer = runner
            .tool("sh")
            .unwrap()
            .args(["-c", "echo no such container >&2; exit 1"]);
        let consumer = runner.tool("cat").unwrap();

        let err = runner.pipe(producer, consumer).await.unwrap_err();
        match err {
            PipeError::Producer(e) => assert_eq!(e.output(), Some("no such container")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn consumer_failure_is_reported() {
        let runner = runner();
        let producer = runner.tool("sh").unwrap().args(["-c", "echo not a tarball"]);
        let consumer = runner
            .tool("sh")
            .unwrap()
            .args(["-c", "cat >/dev/null; exit 2"]);

        let err = runner.pipe(producer, consumer).await.unwrap_err();
        assert!(
            matches!(err, PipeError::Consumer { relayed: Some(14), .. }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn tar_rejecting_silent_producer_reports_zero_bytes() {
        let runner = runner();
        let target = tempfile::tempdir().unwrap();
        let producer = runner.tool("true").unwrap();
        let consumer = runner
            .tool("tar")
            .unwrap()
            .args(["-xf", "-", "-C"])
            .arg_path(target.path());

        let err = runner.pipe(producer, consumer).await.unwrap_err();
        assert!(
            matches!(err, PipeError::Consumer { relayed: Some(0), .. }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn cancellation_interrupts_pipe() {
        let cancel = CancellationToken::new();
        let runner = runner().with_cancellation(cancel.clone());
        let producer = runner.tool("sleep").unwrap().arg("30");
        let consumer = runner.tool("cat").unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = runner.pipe(producer, consumer).await.unwrap_err();
        assert!(
            err.command_error().is_some_and(|e| e.is_cancelled()),
            "got {err:?}"
        );
    }
}
