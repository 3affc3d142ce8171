// ABOUTME: Compile-fail test verifying a build cannot finish while still mounted.
// ABOUTME: This test should fail to compile, validating state machine safety.

use ocirootfs::filesystem::{Copied, ImageBuild};

fn try_finish_mounted(build: ImageBuild<'_, Copied>) {
    // ERROR: finish() method doesn't exist on ImageBuild<Copied>
    let _ = build.finish();
}

fn main() {}
