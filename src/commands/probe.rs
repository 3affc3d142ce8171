// ABOUTME: Probe command implementation.
// ABOUTME: Reports host tool availability and the backend that would be selected.

use ocirootfs::backend::{SELECTION_ORDER, select_backend};
use ocirootfs::config::Config;
use ocirootfs::error::Result;
use ocirootfs::output::Output;
use ocirootfs::process::{ToolProbe, Toolbox};
use serde::Serialize;

/// Host tools the filesystem builder needs regardless of backend.
const BUILD_TOOLS: &[&str] = &["du", "fallocate", "mkfs.ext4", "mount", "umount", "cp", "tar"];

#[derive(Serialize)]
struct ToolStatus {
    name: &'static str,
    path: Option<String>,
}

#[derive(Serialize)]
struct ProbeReport {
    tools: Vec<ToolStatus>,
    backend: Option<String>,
}

pub fn probe(config: &Config, output: &Output) -> Result<()> {
    let settings = config.manager_settings();
    let toolbox = match &settings.search_path {
        Some(path) => Toolbox::with_search_path(path.clone()),
        None => Toolbox::from_env(),
    };

    let mut names: Vec<&'static str> = SELECTION_ORDER
        .iter()
        .flat_map(|kind| kind.required_tools().iter().copied())
        .collect();
    names.extend_from_slice(BUILD_TOOLS);

    let tools: Vec<ToolStatus> = names
        .into_iter()
        .map(|name| ToolStatus {
            name,
            path: toolbox.resolve(name).map(|p| p.display().to_string()),
        })
        .collect();

    for tool in &tools {
        match &tool.path {
            Some(path) => output.progress(&format!("  {:<10} {}", tool.name, path)),
            None => output.progress(&format!("  {:<10} missing", tool.name)),
        }
    }
    for tool in BUILD_TOOLS {
        if !toolbox.has_command(tool) {
            output.warning(&format!("{tool} not found; image builds will fail"));
        }
    }

    let selected = select_backend(&toolbox, settings.backend);
    let report = ProbeReport {
        tools,
        backend: selected.as_ref().ok().map(ToString::to_string),
    };

    let backend = selected?;
    output.success_with(&format!("Backend: {backend}"), Some(&report));
    Ok(())
}
