// ABOUTME: Container-engine backend: create a stopped container and stream its export into tar.
// ABOUTME: Shared by podman and docker; they differ only in binary and how credentials are passed.

use super::error::BackendError;
use super::sealed::Sealed;
use super::traits::{Backend, ExtractRequest, ExtractedTree};
use super::types::BackendKind;
use crate::diagnostics::{Diagnostics, Warning};
use crate::process::{CommandError, CommandRunner, PipeError};
use crate::types::{ContainerName, Credentials};
use async_trait::async_trait;
use std::path::Path;

/// Container engine with a docker-compatible CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Podman,
    Docker,
}

impl Engine {
    pub fn binary(&self) -> &'static str {
        match self {
            Engine::Podman => "podman",
            Engine::Docker => "docker",
        }
    }
}

/// Extracts through `<engine> create` + `<engine> export | tar -x`.
#[derive(Debug, Clone, Copy)]
pub struct EngineBackend {
    engine: Engine,
}

impl Sealed for EngineBackend {}

impl EngineBackend {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// docker has no per-command credentials; log in first.
    async fn login(
        &self,
        runner: &CommandRunner,
        creds: &Credentials,
        diagnostics: &mut Diagnostics,
    ) {
        let login = match runner.tool(self.engine.binary()) {
            Ok(login) => login,
            Err(e) => {
                diagnostics.warn(Warning::login_failed(format!(
                    "{} login: {e}",
                    self.engine.binary()
                )));
                return;
            }
        };

        let result = login
            .args(["login", "-u", creds.username(), "--password-stdin"])
            .stdin_bytes(creds.password())
            .run()
            .await;

        if let Err(e) = result {
            diagnostics.warn(Warning::login_failed(format!(
                "{} login failed, pulling anonymously: {e}",
                self.engine.binary()
            )));
        }
    }

    async fn create_container(
        &self,
        runner: &CommandRunner,
        request: &ExtractRequest<'_>,
        container: &ContainerName,
    ) -> Result<(), CommandError> {
        let mut create = runner
            .tool(self.engine.binary())?
            .args(["create", "--name", container.as_str()]);
        if self.engine == Engine::Podman
            && let Some(creds) = request.usable_credentials()
        {
            create = create.arg("--creds").secret_arg(creds.inline());
        }

        // The command is never run; it only has to exist for images without
        // an entrypoint.
        create
            .arg(request.image.as_str())
            .arg("/bin/true")
            .run()
            .await?;
        Ok(())
    }

    async fn export_into(
        &self,
        runner: &CommandRunner,
        container: &ContainerName,
        target: &Path,
    ) -> Result<u64, BackendError> {
        std::fs::create_dir_all(target).map_err(|source| BackendError::ExtractDir {
            path: target.to_path_buf(),
            source,
        })?;

        let export = runner
            .tool(self.engine.binary())
            .map_err(BackendError::PipeStart)?
            .arg("export")
            .arg(container.as_str());
        let untar = runner
            .tool("tar")
            .map_err(BackendError::PipeStart)?
            .args(["-xf", "-", "-C"])
            .arg_path(target);

        match runner.pipe(export, untar).await {
            Ok(bytes) => Ok(bytes),
            // tar refuses an empty stream, but an empty container exports nothing.
            Err(PipeError::Consumer {
                relayed: Some(0), ..
            }) => {
                tracing::debug!(
                    "{} exported an empty stream for {}; leaving {} empty",
                    self.engine.binary(),
                    container,
                    target.display()
                );
                Ok(0)
            }
            Err(PipeError::Start(e)) => Err(BackendError::PipeStart(e)),
            Err(PipeError::Producer(e)) => Err(BackendError::Export(e)),
            Err(PipeError::Consumer { source, .. }) => Err(BackendError::Extract(source)),
            Err(PipeError::Relay(e)) => Err(BackendError::Relay(e)),
            Err(PipeError::Interrupted(e)) => Err(BackendError::Interrupted(e)),
        }
    }

    async fn remove_container(
        &self,
        runner: &CommandRunner,
        container: &ContainerName,
    ) -> Result<(), CommandError> {
        let cleanup = runner.detached();
        cleanup
            .tool(self.engine.binary())?
            .args(["rm", "-f", container.as_str()])
            .run()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for EngineBackend {
    fn kind(&self) -> BackendKind {
        match self.engine {
            Engine::Podman => BackendKind::Podman,
            Engine::Docker => BackendKind::Docker,
        }
    }

    async fn extract(
        &self,
        runner: &CommandRunner,
        request: &ExtractRequest<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<ExtractedTree, BackendError> {
        let container = request.container_name();
        let target = request.operation.extract_dir();

        if self.engine == Engine::Docker
            && let Some(creds) = request.usable_credentials()
        {
            self.login(runner, creds, diagnostics).await;
        }

        tracing::info!(
            "creating {} container {} from {}",
            self.engine.binary(),
            container,
            request.image
        );
        if let Err(e) = self.create_container(runner, request, &container).await {
            if let Err(cleanup) = self.remove_container(runner, &container).await {
                tracing::debug!("discarding {} failed: {}", container, cleanup);
            }
            return Err(BackendError::ContainerCreate(e));
        }

        let exported = self.export_into(runner, &container, &target).await;

        if let Err(e) = self.remove_container(runner, &container).await {
            diagnostics.warn(Warning::container_cleanup(format!(
                "failed to remove {} container {container}: {e}",
                self.engine.binary()
            )));
        }

        let bytes = exported?;
        tracing::debug!("exported {} bytes into {}", bytes, target.display());
        Ok(ExtractedTree::new(target))
    }

    async fn release(
        &self,
        _runner: &CommandRunner,
        tree: ExtractedTree,
        diagnostics: &mut Diagnostics,
    ) {
        let (root, _) = tree.into_parts();
        if let Err(e) = std::fs::remove_dir_all(&root)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            diagnostics.warn(Warning::directory_cleanup(format!(
                "failed to remove extracted tree {}: {e}",
                root.display()
            )));
        }
    }
}
