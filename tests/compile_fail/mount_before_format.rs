// ABOUTME: Compile-fail test verifying an image cannot be mounted before it is formatted.
// ABOUTME: This test should fail to compile, validating state machine safety.

use ocirootfs::filesystem::{Allocated, ImageBuild};

async fn try_mount_unformatted(build: ImageBuild<'_, Allocated>) {
    // ERROR: mount() method doesn't exist on ImageBuild<Allocated>
    let _ = build.mount().await;
}

fn main() {}
