// ABOUTME: A fake host whose tools are shell scripts on a private search path.
// ABOUTME: Every stub appends its argv to a shared log so tests can assert call order.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct StubHost {
    root: TempDir,
}

impl StubHost {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("bin")).unwrap();
        fs::create_dir(root.path().join("captured")).unwrap();
        fs::write(root.path().join("calls.log"), "").unwrap();
        Self { root }
    }

    /// Directory to use as the search path.
    pub fn bin(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    /// Where the umount stub copies the mounted tree before "unmounting".
    pub fn captured(&self) -> PathBuf {
        self.root.path().join("captured")
    }

    /// Scratch space for fixtures and outputs.
    pub fn scratch(&self, name: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    fn log_path(&self) -> PathBuf {
        self.root.path().join("calls.log")
    }

    /// Install `name` as a shell script that logs its arguments, then runs `body`.
    pub fn script(&self, name: &str, body: &str) {
        let path = self.bin().join(name);
        let script = format!(
            "#!/bin/sh\necho \"{name} $*\" >> '{log}'\n{body}\n",
            log = self.log_path().display()
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Make the real `name` available on the search path.
    pub fn link(&self, name: &str) {
        let real = which::which(name).unwrap_or_else(|_| panic!("{name} must be installed"));
        std::os::unix::fs::symlink(real, self.bin().join(name)).unwrap();
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.bin().join(name)).unwrap();
    }

    /// Logged invocations, one line per call.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn calls_to(&self, tool: &str) -> Vec<String> {
        let prefix = format!("{tool} ");
        self.calls()
            .into_iter()
            .filter(|line| line.starts_with(&prefix) || line == tool)
            .collect()
    }

    /// Filesystem tools: fallocate creates an empty file, mkfs succeeds,
    /// mount is a no-op on a plain directory and umount snapshots it.
    pub fn install_builder_tools(&self) {
        self.script("fallocate", "touch \"$3\"");
        self.script("mkfs.ext4", "exit 0");
        self.script("mount", "exit 0");
        self.script(
            "umount",
            &format!("cp -a \"$1/.\" '{}/'", self.captured().display()),
        );
        self.link("cp");
        self.link("du");
        self.link("tar");
    }

    /// A docker-compatible engine that exports `fixture` as a tarball.
    pub fn install_engine(&self, engine: &str, fixture: &Path) {
        self.script(
            engine,
            &format!(
                r#"case "$1" in
  login) cat > '{root}/{engine}-login-stdin' ;;
  create) ;;
  export) exec tar -cf - -C '{fixture}' . ;;
  rm) ;;
  *) echo "unexpected $1" >&2; exit 2 ;;
esac"#,
                root = self.root.path().display(),
                fixture = fixture.display()
            ),
        );
    }

    /// What the engine's `login` read from stdin.
    pub fn login_stdin(&self, engine: &str) -> Option<String> {
        fs::read_to_string(self.root.path().join(format!("{engine}-login-stdin"))).ok()
    }

    /// skopeo writes an empty layout; buildah reports `fixture` as the mount point.
    pub fn install_skopeo_buildah(&self, fixture: &Path) {
        self.script(
            "skopeo",
            "for last; do :; done\nmkdir -p \"${last#oci:}\"",
        );
        self.script(
            "buildah",
            &format!(
                r#"case "$1" in
  unshare) shift; exec "$@" ;;
  from) ;;
  mount) echo '{fixture}' ;;
  rm) ;;
  *) echo "unexpected $1" >&2; exit 2 ;;
esac"#,
                fixture = fixture.display()
            ),
        );
    }
}

/// A small root filesystem tree.
pub fn fixture_tree(dir: &Path) {
    fs::create_dir_all(dir.join("etc")).unwrap();
    fs::create_dir_all(dir.join("bin")).unwrap();
    fs::write(dir.join("etc/hostname"), "microvm\n").unwrap();
    fs::write(dir.join("bin/init"), "#!/bin/sh\n").unwrap();
    std::os::unix::fs::symlink("init", dir.join("bin/sh")).unwrap();
}
