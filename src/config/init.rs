// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates an ocirootfs.yml template file.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const TEMPLATE: &str = r#"# ocirootfs configuration. Every field is optional.

# Where the temporary workspace is created (default: system temp dir).
# work_dir: /var/tmp

# Look up skopeo/buildah/podman/docker and filesystem tools here instead of $PATH.
# search_path: /usr/local/bin:/usr/bin:/usr/sbin

# Force a backend: skopeo-buildah, podman or docker (default: auto-detect).
# backend: skopeo-buildah

# Image capacity when the extracted tree cannot be measured.
fallback_size_mib: 1024

# Per-command timeout.
command_timeout: 5m

# Prefix for temporary container names.
container_prefix: ocirootfs-extract

# Registry credentials.
# auth:
#   username: my-user
#   password:
#     env: REGISTRY_PASSWORD
"#;

/// Write a template config into `dir`, returning its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    Ok(config_path)
}
