// ABOUTME: Host tool discovery on a configurable search path.
// ABOUTME: Resolution results are cached for the life of the process.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Answers whether a tool is installed.
pub trait ToolProbe {
    fn has_command(&self, name: &str) -> bool;
}

/// Resolves tool names to absolute paths.
///
/// Every invocation executes the resolved path, so the probe answer and the
/// program that actually runs always agree.
pub struct Toolbox {
    search_path: Option<OsString>,
    cache: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field("search_path", &self.search_path)
            .finish()
    }
}

impl Toolbox {
    /// Resolve against the process `PATH`.
    pub fn from_env() -> Self {
        Self {
            search_path: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve against an explicit `:`-separated search path.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Absolute path of `name`, or `None` if it is not installed.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if let Some(hit) = self.cache.lock().get(name) {
            return hit.clone();
        }

        let found = self.lookup(name);
        tracing::debug!("resolved {} -> {:?}", name, found);
        self.cache.lock().insert(name.to_string(), found.clone());
        found
    }

    fn lookup(&self, name: &str) -> Option<PathBuf> {
        match &self.search_path {
            None => which::which(name).ok(),
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new("/").to_path_buf());
                which::which_in(name, Some(paths), cwd).ok()
            }
        }
    }
}

impl ToolProbe for Toolbox {
    fn has_command(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn finds_sh_on_process_path() {
        // 'sh' should exist on any Unix system
        assert!(Toolbox::from_env().has_command("sh"));
    }

    #[test]
    fn missing_tool_is_reported_absent() {
        assert!(!Toolbox::from_env().has_command("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn explicit_search_path_hides_process_path() {
        let dir = tempfile::tempdir().unwrap();
        let toolbox = Toolbox::with_search_path(dir.path());
        assert!(!toolbox.has_command("sh"));
    }

    #[test]
    fn resolves_executables_in_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("skopeo");
        std::fs::write(&tool, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let toolbox = Toolbox::with_search_path(dir.path());
        assert_eq!(toolbox.resolve("skopeo"), Some(tool));
    }

    #[test]
    fn resolution_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let toolbox = Toolbox::with_search_path(dir.path());
        assert!(!toolbox.has_command("podman"));

        let tool = dir.path().join("podman");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Host tools don't change mid-run; the first answer sticks.
        assert!(!toolbox.has_command("podman"));
    }
}
