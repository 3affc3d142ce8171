// ABOUTME: Build command implementation.
// ABOUTME: Resolves credentials, runs the manager, and cancels on Ctrl-C.

use ocirootfs::backend::BackendKind;
use ocirootfs::config::Config;
use ocirootfs::error::{Error, Result};
use ocirootfs::output::Output;
use ocirootfs::types::{Credentials, ImageRef};
use ocirootfs::{RootfsManager, RootfsReport};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Arguments of `ocirootfs build`.
pub struct BuildArgs {
    pub image: String,
    pub output: PathBuf,
    pub username: Option<String>,
    pub password_env: Option<String>,
    pub backend: Option<BackendKind>,
}

pub async fn build(config: Config, args: BuildArgs, mut output: Output) -> Result<()> {
    let image = ImageRef::parse(&args.image)?;
    let credentials = resolve_credentials(&config, &args)?;

    let mut settings = config.manager_settings();
    if args.backend.is_some() {
        settings.backend = args.backend;
    }
    let manager = RootfsManager::new(settings)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cleaning up");
            on_interrupt.cancel();
        }
    });

    output.start_timer();
    output.progress(&format!("Building {} from {}", args.output.display(), image));

    let result = manager
        .materialize_rootfs_with_cancel(&image, &args.output, credentials.as_ref(), cancel)
        .await;

    // The workspace goes away whether or not the build succeeded.
    if let Err(e) = manager.close() {
        output.warning(&format!("failed to remove workspace: {e}"));
    }

    let report = result.map_err(|e| {
        if let Some(tool_output) = e.tool_output() {
            tracing::debug!("tool output:\n{}", tool_output);
        }
        Error::from(e)
    })?;
    report_success(&report, &output);
    Ok(())
}

fn resolve_credentials(config: &Config, args: &BuildArgs) -> Result<Option<Credentials>> {
    match (&args.username, &args.password_env) {
        (Some(username), Some(var)) => {
            let password =
                std::env::var(var).map_err(|_| Error::MissingEnvVar(var.clone()))?;
            Ok(Some(Credentials::new(username.clone(), password)))
        }
        _ => config.credentials(),
    }
}

fn report_success(report: &RootfsReport, output: &Output) {
    for warning in &report.warnings {
        output.warning(&warning.message);
    }
    output.success_with(
        &format!(
            "Built {} ({}, via {})",
            report.output.display(),
            report.size,
            report.backend
        ),
        Some(report),
    );
}
