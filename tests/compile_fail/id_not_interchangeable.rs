// ABOUTME: Compile-fail test verifying ContainerName and OperationId are not interchangeable.
// ABOUTME: This test should fail to compile, validating type safety.

use ocirootfs::types::{ContainerName, OperationId};

fn takes_container_name(_name: ContainerName) {}

fn main() {
    let operation = OperationId::from_index(1);
    takes_container_name(operation); // ERROR: expected ContainerName, found OperationId
}
