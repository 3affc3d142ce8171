// ABOUTME: Trybuild runner for compile-time type safety tests.
// ABOUTME: Verifies that invalid type usage fails to compile.

#[test]
fn id_types_not_interchangeable() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/compile_fail/id_not_interchangeable.rs");
}

#[test]
fn mount_not_available_before_format() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/compile_fail/mount_before_format.rs");
}

#[test]
fn finish_not_available_while_mounted() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/compile_fail/finish_while_mounted.rs");
}
